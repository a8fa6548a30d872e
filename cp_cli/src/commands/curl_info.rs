//! Curl-info command implementation.

use console::style;

use cp_core::CurlConfig;
use cp_io::CurlContext;

/// Run the curl-info command.
pub async fn run(config: CurlConfig) {
    let ctx = CurlContext::system(config);
    let info = ctx.version_info().await;

    println!("{} curl", style("==>").cyan().bold());
    println!("    executable: {}", ctx.executable().display());
    match &info.version {
        Some(version) => println!("    version:    {}", version.as_str()),
        None => println!("    version:    {}", style("unknown").yellow()),
    }

    let http2 = if info.supports_http2() {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    println!("    HTTP/2:     {}", http2);

    if !info.features.is_empty() {
        println!("    features:   {}", info.features.join(" "));
    }
}
