//! Minimal CLI for compiling filters and listing fixture data.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use bson::{Bson, Document};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::db::MemoryStore;
use crate::graphql::orm::{EntityQuery, FilterError, FilterExpression};
use crate::graphql::pagination::{ConnectionArgs, PaginationArgs};
use crate::services::{Booking, Customer, ServiceProvider, Services};

pub const USAGE: &str = "\
Usage:
  marketplace-query compile <entity> [--filter <json | @file>]
  marketplace-query list <entity> --fixtures <file> [--filter <json | @file>]
                         [--page N] [--limit N] [--first N] [--after CURSOR] [--near]

Entities: customers, service-providers, bookings

compile  print the store query for a filter as extended JSON
list     run a listing over a JSON fixture file ({\"<collection>\": [documents]})
         and print the page or connection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Customers,
    ServiceProviders,
    Bookings,
}

impl FromStr for Entity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "customers" | "customer" => Ok(Entity::Customers),
            "service-providers" | "serviceproviders" | "providers" => {
                Ok(Entity::ServiceProviders)
            }
            "bookings" | "booking" => Ok(Entity::Bookings),
            other => bail!("unknown entity `{other}`"),
        }
    }
}

/// Filter given inline or as `@path`
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSource {
    Inline(String),
    File(PathBuf),
}

impl From<&str> for FilterSource {
    fn from(value: &str) -> Self {
        match value.strip_prefix('@') {
            Some(path) => FilterSource::File(PathBuf::from(path)),
            None => FilterSource::Inline(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub fixtures: Option<PathBuf>,
    pub filter: Option<FilterSource>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
    pub first: Option<i32>,
    pub after: Option<String>,
    /// Service providers only: proximity listing around the filter's location
    pub near: bool,
}

impl ListOptions {
    fn wants_cursor(&self) -> bool {
        self.first.is_some() || self.after.is_some()
    }

    fn wants_offset(&self) -> bool {
        self.page.is_some() || self.limit.is_some()
    }

    fn pagination_args(&self) -> PaginationArgs {
        PaginationArgs {
            limit: self.limit,
            page: self.page,
        }
    }

    fn connection_args(&self) -> ConnectionArgs {
        ConnectionArgs {
            first: self.first,
            after: self.after.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Compile {
        entity: Entity,
        filter: Option<FilterSource>,
    },
    List {
        entity: Entity,
        options: ListOptions,
    },
    Help,
}

impl Command {
    /// Parse arguments (without the program name).
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(subcommand) = args.next() else {
            return Ok(Command::Help);
        };

        match subcommand.as_str() {
            "help" | "--help" | "-h" => Ok(Command::Help),
            "compile" | "list" => {
                let entity: Entity = args
                    .next()
                    .ok_or_else(|| anyhow!("missing <entity> for `{subcommand}`"))?
                    .parse()?;
                let options = parse_options(args)?;

                if subcommand == "compile" {
                    Ok(Command::Compile {
                        entity,
                        filter: options.filter,
                    })
                } else {
                    if options.fixtures.is_none() {
                        bail!("`list` requires --fixtures <file>");
                    }
                    Ok(Command::List { entity, options })
                }
            }
            other => bail!("unknown command `{other}`\n\n{USAGE}"),
        }
    }
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<ListOptions> {
    let mut options = ListOptions::default();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };

        if flag == "--near" {
            options.near = true;
            continue;
        }

        let value = match inline {
            Some(value) => value,
            None => args
                .next()
                .ok_or_else(|| anyhow!("missing value for `{flag}`"))?,
        };

        match flag.as_str() {
            "--filter" => options.filter = Some(FilterSource::from(value.as_str())),
            "--fixtures" => options.fixtures = Some(PathBuf::from(value)),
            "--page" => options.page = Some(parse_number(&flag, &value)?),
            "--limit" => options.limit = Some(parse_number(&flag, &value)?),
            "--first" => options.first = Some(parse_number(&flag, &value)?),
            "--after" => options.after = Some(value),
            other => bail!("unknown option `{other}`"),
        }
    }

    Ok(options)
}

fn parse_number(flag: &str, value: &str) -> Result<i32> {
    value
        .parse()
        .with_context(|| format!("`{flag}` expects a number, got `{value}`"))
}

/// Run a command and return the text to print.
pub async fn run(command: Command, config: &Config) -> Result<String> {
    match command {
        Command::Help => Ok(USAGE.to_string()),
        Command::Compile { entity, filter } => {
            let filter = load_filter(filter.as_ref()).await?;
            let expression = filter.map(FilterExpression::try_from).transpose()?;
            let query = compile_query(entity, expression.as_ref())?;

            tracing::info!(?entity, "Compiled filter");
            Ok(serde_json::to_string_pretty(
                &Bson::Document(query).into_relaxed_extjson(),
            )?)
        }
        Command::List { entity, options } => {
            let path = options
                .fixtures
                .clone()
                .ok_or_else(|| anyhow!("`list` requires --fixtures <file>"))?;
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read fixtures from {}", path.display()))?;
            let fixtures: Value = serde_json::from_str(&raw)
                .with_context(|| format!("Fixtures in {} are not valid JSON", path.display()))?;
            let store = MemoryStore::from_json(fixtures)?;
            tracing::info!(collections = ?store.collection_names(), "Loaded fixtures");

            let services = Services::new(Arc::new(store), config.page_limits);
            let filter = load_filter(options.filter.as_ref()).await?;
            let envelope = list(&services, entity, &options, filter).await?;
            Ok(serde_json::to_string_pretty(&envelope)?)
        }
    }
}

/// The full store query for an entity: base predicate plus the compiled filter.
pub fn compile_query(
    entity: Entity,
    filter: Option<&FilterExpression>,
) -> Result<Document, FilterError> {
    let predicate = match entity {
        Entity::Customers => EntityQuery::<Customer>::new().filter(filter)?.predicate().clone(),
        Entity::ServiceProviders => EntityQuery::<ServiceProvider>::new()
            .filter(filter)?
            .predicate()
            .clone(),
        Entity::Bookings => EntityQuery::<Booking>::new().filter(filter)?.predicate().clone(),
    };
    Ok(predicate)
}

async fn list(
    services: &Services<MemoryStore>,
    entity: Entity,
    options: &ListOptions,
    filter: Option<Value>,
) -> Result<Value> {
    match entity {
        Entity::Customers => {
            if options.wants_cursor() || options.near {
                bail!("customers are listed with --page/--limit only");
            }
            let filter = typed(filter)?;
            let page = services
                .customers
                .get_paginated_customers(&options.pagination_args(), filter.as_ref())
                .await?;
            envelope_json(&page)
        }
        Entity::ServiceProviders => {
            let filter = typed(filter)?;
            let providers = &services.service_providers;
            if options.near {
                let filter = filter
                    .ok_or_else(|| anyhow!("--near needs a --filter with `location.near`"))?;
                let conn = providers
                    .get_paginated_service_providers_by_location(&options.connection_args(), &filter)
                    .await?;
                envelope_json(&conn)
            } else if options.wants_cursor() {
                let conn = providers
                    .get_paginated_service_providers(&options.connection_args(), filter.as_ref())
                    .await?;
                envelope_json(&conn)
            } else {
                let page = providers
                    .get_service_providers_pagination(&options.pagination_args(), filter.as_ref())
                    .await?;
                envelope_json(&page)
            }
        }
        Entity::Bookings => {
            if options.wants_offset() || options.near {
                bail!("bookings are listed with --first/--after only");
            }
            let filter = typed(filter)?;
            let conn = services
                .bookings
                .get_paginated_bookings(&options.connection_args(), filter.as_ref())
                .await?;
            envelope_json(&conn)
        }
    }
}

async fn load_filter(source: Option<&FilterSource>) -> Result<Option<Value>> {
    let raw = match source {
        None => return Ok(None),
        Some(FilterSource::Inline(raw)) => raw.clone(),
        Some(FilterSource::File(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read filter from {}", path.display()))?,
    };
    let value = serde_json::from_str(&raw).context("Filter is not valid JSON")?;
    Ok(Some(value))
}

fn typed<T: DeserializeOwned>(filter: Option<Value>) -> Result<Option<T>> {
    filter
        .map(serde_json::from_value)
        .transpose()
        .context("Filter does not match the entity's filter input")
}

/// Envelope as relaxed extended JSON (ids as `$oid`, dates as ISO strings).
fn envelope_json<T: Serialize>(envelope: &T) -> Result<Value> {
    Ok(bson::to_bson(envelope)?.into_relaxed_extjson())
}
