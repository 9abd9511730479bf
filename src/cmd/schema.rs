//! Schema command - print the expected input feed format

use crate::events::EventFeed;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = schema_for!(EventFeed);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}
