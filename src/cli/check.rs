use anyhow::Result;
use clap::Args;
use unauth_gate::BlockerConfig;
use unauth_guard::EffectiveConfig;

use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct CheckConfigArgs {
    /// Output format
    #[arg(short, long, default_value = "human")]
    pub output: OutputFormat,
}

pub fn cmd_check_config(args: CheckConfigArgs, config: &BlockerConfig) -> Result<()> {
    println!("{}", render(&EffectiveConfig::from(config), &args.output)?);
    Ok(())
}

fn render(view: &EffectiveConfig, format: &OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(view)?,
        OutputFormat::Yaml => serde_yaml::to_string(view)?,
        OutputFormat::Human => {
            let mut lines = vec![format!("policy:           {}", view.policy)];
            if let Some(max) = view.max_unauthorized_attempts {
                lines.push(format!("max attempts:     {max}"));
            }
            let statuses: Vec<String> = view
                .failure_statuses
                .iter()
                .map(|status| status.to_string())
                .collect();
            lines.push(format!("block duration:   {}", view.block_duration));
            lines.push(format!("cache capacity:   {}", view.cache_capacity));
            lines.push(format!("failure statuses: {}", statuses.join(", ")));
            lines.push(format!("notify:           {}", view.notify));
            lines.join("\n")
        }
    };
    Ok(rendered)
}
