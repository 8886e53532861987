//! # Data Loader Crate
//!
//! Loads the tabular inputs of the recommender: the movie catalog (items),
//! the user table and the interaction log exported by the batch ETL.
//!
//! ## Main Components
//!
//! - **types**: Row and table types (Item, User, RawInteraction, Catalog)
//! - **parser**: Parse header-first delimited files into tables
//! - **index**: Load a whole catalog directory and validate it
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::Catalog;
//! use std::path::Path;
//!
//! let catalog = Catalog::load_from_dir(Path::new("data/kion"))?;
//! let (items, users, interactions) = catalog.counts();
//! println!("{} items, {} users, {} interactions", items, users, interactions);
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod index;

pub use error::{DataLoadError, Result};
pub use index::{INTERACTIONS_FILE, ITEMS_FILE, USERS_FILE};
pub use types::{
    // Type aliases
    ItemId,
    UserId,
    // Rows
    Item,
    User,
    RawInteraction,
    // Tables
    ItemTable,
    UserTable,
    InteractionTable,
    Catalog,
    // Column names
    DATETIME_COLUMN,
    ITEM_ID_COLUMN,
    TITLE_COLUMN,
    USER_ID_COLUMN,
    WATCHED_PCT_COLUMN,
};
