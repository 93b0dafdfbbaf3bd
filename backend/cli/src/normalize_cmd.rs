use anyhow::Result;

use chatmark_markdown::normalize;

use crate::input::read_input;

pub async fn run(input: &str) -> Result<()> {
    let raw = read_input(input).await?;
    print!("{}", normalize(&raw, true));
    Ok(())
}
