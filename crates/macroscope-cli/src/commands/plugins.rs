use anyhow::Result;
use macroscope::PluginRegistry;

pub fn execute() -> Result<()> {
    for name in PluginRegistry::builtin().names() {
        println!("{}", name);
    }
    Ok(())
}
