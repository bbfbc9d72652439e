use msig::config::Config;

pub async fn new_config(config_path: &str) -> anyhow::Result<()> {
    let cfg = Config::new().await;
    cfg.save(config_path).await?;
    log::info!("wrote default config to {config_path}");
    Ok(())
}
