//! The Stack Exchange data dump tables

use super::{Column, SqlType, Table};
use crate::error::{LoadError, Result};

use SqlType::{Boolean, Integer, SmallInt, Timestamp};

/// Ordered set of tables for one run
///
/// Constructed once at startup and passed by reference to the loader.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: Vec<Table>,
}

impl Catalog {
    pub fn new(tables: Vec<Table>) -> Result<Self> {
        for (i, table) in tables.iter().enumerate() {
            if tables[..i].iter().any(|t| t.name() == table.name()) {
                return Err(LoadError::schema(format!(
                    "table '{}' is declared twice",
                    table.name()
                )));
            }
        }
        Ok(Self { tables })
    }

    /// The seven tables of a Stack Exchange site dump, in load order
    pub fn stack_exchange() -> Result<Self> {
        Self::new(vec![
            badges()?,
            comments()?,
            post_links()?,
            posts()?,
            tags()?,
            users()?,
            votes()?,
        ])
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Requested tables in catalog order; all tables when `names` is empty
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&Table>> {
        if let Some(unknown) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| self.table(name).is_none())
        {
            return Err(LoadError::UnknownTable(unknown.to_string()));
        }

        Ok(self
            .tables
            .iter()
            .filter(|t| names.is_empty() || names.iter().any(|n| n.as_ref() == t.name()))
            .collect())
    }
}

fn badges() -> Result<Table> {
    Table::new(
        "badges",
        vec![
            Column::fixed("Id", Integer),
            Column::fixed("UserId", Integer),
            Column::varchar("Name", 50),
            Column::fixed("Date", Timestamp),
            Column::fixed("Class", SmallInt),
            Column::fixed("TagBased", Boolean),
        ],
    )
}

fn comments() -> Result<Table> {
    Table::new(
        "comments",
        vec![
            Column::fixed("Id", Integer),
            Column::fixed("PostId", Integer),
            Column::fixed("Score", Integer),
            Column::varchar("Text", 600),
            Column::fixed("CreationDate", Timestamp),
            Column::varchar("UserDisplayName", 40).with_nulls(),
            Column::fixed("UserId", Integer),
            Column::varchar("ContentLicense", 12),
        ],
    )
}

fn post_links() -> Result<Table> {
    Table::new(
        "postLinks",
        vec![
            Column::fixed("Id", Integer),
            Column::fixed("CreationDate", Timestamp),
            Column::fixed("PostId", Integer),
            Column::fixed("RelatedPostId", Integer),
            Column::fixed("LinkTypeId", SmallInt),
        ],
    )
}

fn posts() -> Result<Table> {
    Table::new(
        "posts",
        vec![
            Column::fixed("Id", Integer),
            Column::fixed("PostTypeId", SmallInt),
            Column::fixed("AcceptedAnswerId", Integer),
            Column::fixed("ParentId", Integer).with_nulls(),
            Column::fixed("CreationDate", Timestamp),
            Column::fixed("DeletionDate", Timestamp).with_nulls(),
            Column::fixed("Score", Integer),
            Column::fixed("ViewCount", Integer),
            Column::text("Body"),
            Column::fixed("OwnerUserId", Integer),
            Column::varchar("OwnerDisplayName", 40).with_nulls(),
            Column::fixed("LastEditorUserId", Integer),
            Column::varchar("LastEditorDisplayName", 40),
            Column::fixed("LastEditDate", Timestamp),
            Column::fixed("LastActivityDate", Timestamp),
            Column::varchar("Title", 250),
            Column::varchar("Tags", 250),
            Column::fixed("AnswerCount", Integer),
            Column::fixed("CommentCount", Integer),
            Column::fixed("FavoriteCount", Integer),
            Column::fixed("ClosedDate", Timestamp).with_nulls(),
            Column::fixed("CommunityOwnedDate", Timestamp).with_nulls(),
            Column::varchar("ContentLicense", 12),
        ],
    )
}

fn tags() -> Result<Table> {
    Table::new(
        "tags",
        vec![
            Column::fixed("Id", Integer),
            Column::varchar("TagName", 35),
            Column::fixed("Count", Integer),
            Column::fixed("ExcerptPostId", Integer),
            Column::fixed("WikiPostId", Integer),
            Column::fixed("IsModeratorOnly", Boolean).with_nulls(),
            Column::fixed("IsRequired", Boolean).with_nulls(),
        ],
    )
}

fn users() -> Result<Table> {
    Table::new(
        "users",
        vec![
            Column::fixed("Id", Integer),
            Column::fixed("Reputation", Integer),
            Column::fixed("CreationDate", Timestamp),
            Column::varchar("DisplayName", 40),
            Column::fixed("LastAccessDate", Timestamp),
            Column::varchar("WebsiteUrl", 200).with_nulls(),
            Column::varchar("Location", 100).with_nulls(),
            Column::text("AboutMe"),
            Column::fixed("Views", Integer),
            Column::fixed("UpVotes", Integer),
            Column::fixed("DownVotes", Integer),
            Column::varchar("ProfileImageUrl", 200).with_nulls(),
            Column::varchar("EmailHash", 32).with_nulls(),
            Column::fixed("AccountId", Integer).with_nulls(),
        ],
    )
}

fn votes() -> Result<Table> {
    Table::new(
        "votes",
        vec![
            Column::fixed("Id", Integer),
            Column::fixed("PostId", Integer),
            Column::fixed("VoteTypeId", SmallInt),
            Column::fixed("UserId", Integer).with_nulls(),
            Column::fixed("CreationDate", Timestamp),
            Column::fixed("BountyAmount", Integer).with_nulls(),
        ],
    )
}
