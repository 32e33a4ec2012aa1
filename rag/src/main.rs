use anyhow::Result;
use rag::{Settings, build_providers, compare_provider, init_logging, render_as};
use rag_embeddings::client::build_session;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    init_logging(&settings.logging);

    // 所有服务商共用一个连接池，main 结束时释放
    let session = build_session(settings.timeout)?;
    let providers = build_providers(&settings, &session)?;
    if providers.is_empty() {
        tracing::warn!("未配置任何嵌入服务商，请设置 OPENAI_API_KEY 或 COHERE_API_KEY");
        return Ok(());
    }

    println!("🤖 嵌入服务商对比：{} 条文本，每个服务商 {} 次\n", settings.texts.len(), settings.bench_runs);

    // 逐个服务商顺序执行，避免相互争用网络
    for provider in &providers {
        match compare_provider(provider.as_ref(), &settings.texts, settings.bench_runs).await {
            Ok(summary) => println!("{}", render_as(&summary, settings.output)?),
            Err(e) => {
                tracing::error!(provider = provider.name(), error = %e, "基准测试失败");
                eprintln!("❌ {}: {}\n", provider.name(), e);
            }
        }
    }

    println!("🎉 测试完成！");
    Ok(())
}
