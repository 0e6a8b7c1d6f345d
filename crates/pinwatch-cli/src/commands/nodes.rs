use pinwatch_core::{Capability, WatchConfig};

pub fn run(config: &WatchConfig) {
    let registry = match config.registry() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("pinwatch v{}", pinwatch_core::VERSION);
    println!(
        "  {} node(s), API prefix {}, call timeout {}ms, batch deadline {}ms",
        registry.len(),
        if registry.api_prefix().is_empty() { "(none)" } else { registry.api_prefix() },
        config.call_timeout.as_millis(),
        config.batch_deadline.as_millis(),
    );
    println!();

    for node in registry.nodes() {
        println!("{:>3}  {:<30} {:<14} {}", node.id, node.label(), node.role.to_string(), node.address);
        if !node.display.description.is_empty() {
            println!("     {}", node.display.description);
        }
        for &cap in node.role.capabilities() {
            let urls = registry.urls(node, cap, config.list_limit);
            let shown = match cap {
                Capability::IntentList => urls.join("\n                           "),
                _ => urls.into_iter().next().unwrap_or_default(),
            };
            println!("     {:<20} {}", cap.to_string(), shown);
        }
        println!();
    }
}
