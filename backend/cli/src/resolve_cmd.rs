use anyhow::Result;
use serde::Serialize;

use chatmark_config::ChatmarkConfig;
use chatmark_core::UserIdentity;
use chatmark_security::{LinkResolver, LinkTarget};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Resolution<'a> {
    #[serde(flatten)]
    link: &'a LinkTarget,
    display_href: String,
    target: &'a str,
}

pub fn run(href: &str, user: &str, config: &ChatmarkConfig) -> Result<()> {
    let links = config.render_settings().links;
    let resolver = LinkResolver::for_user(&UserIdentity::new(user))
        .with_targets(links.plain_target, links.file_target);
    let link = resolver.resolve(href);
    let resolution = Resolution {
        display_href: link.display_href(),
        target: resolver.target_for(&link),
        link: &link,
    };
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}
