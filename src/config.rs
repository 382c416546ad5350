use serde::Deserialize;

use crate::catalog::allocator::IdAllocator;
use crate::catalog::schema::Schema;
use crate::error::Result;
use crate::sql::optimizer::group_join_finder::GroupJoinFinder;

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: String,

    /// Schemas whose tables and groups get IDs from the reserved space.
    #[serde(default)]
    pub reserved_schemas: Vec<String>,

    /// Whether queries are rewritten into group join trees.
    pub group_joins: bool,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("log_level", "info")?
            .set_default("reserved_schemas", vec!["information_schema", "sys"])?
            .set_default("group_joins", true)?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(
            config::Environment::with_prefix("HKEYDB")
                .list_separator(",")
                .with_list_parse_key("reserved_schemas")
                .try_parsing(true),
        );
        Ok(cfg.build()?.try_deserialize()?)
    }

    /// An allocator for merging into `schema`.
    pub fn id_allocator(&self, schema: &Schema) -> IdAllocator {
        IdAllocator::seeded(schema, self.reserved_schemas.clone())
    }

    /// The group join rewrite for queries over `schema`, if enabled.
    pub fn group_join_finder<'a>(&self, schema: &'a Schema) -> Option<GroupJoinFinder<'a>> {
        self.group_joins.then(|| GroupJoinFinder::new(schema))
    }
}

pub fn init_logger(cfg: &Config) -> Result<()> {
    env_logger::Builder::new().parse_filters(&cfg.log_level).try_init()?;
    Ok(())
}
