use crate::codec::FolderType;
use crate::model::{FolderId, ItemId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EccoError {
    #[error("No such attribute on {class}: {name}")]
    NoSuchAttribute { class: String, name: String },

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Folder name {name:?} matches several folders: {ids:?}")]
    AmbiguousFolder { name: String, ids: Vec<FolderId> },

    #[error("{folder} is not a {expected} folder (host reports {actual})")]
    FolderTypeMismatch {
        folder: String,
        expected: FolderType,
        actual: FolderType,
    },

    #[error("Only typed folders can be created: {0}")]
    UntypedFolderCreate(String),

    #[error("No item for key: {0}")]
    KeyNotFound(String),

    #[error("Multiple items for key: {0}")]
    AmbiguousKey(String),

    #[error("Validation ambiguity for item {item:?}: {classes:?}")]
    AmbiguousClass {
        item: Option<ItemId>,
        classes: Vec<String>,
    },

    #[error("No declared class under {class} matches item {item:?}")]
    ClassNotResolved { class: String, item: Option<ItemId> },

    #[error("Item {item} is not a {expected}")]
    WrongItemClass { expected: String, item: ItemId },

    #[error("Class {0} has no container folder")]
    NoContainer(String),

    #[error("Attribute {attr} cannot hold {value}")]
    InvalidValue { attr: String, value: String },

    #[error("Invalid class declaration: {0}")]
    InvalidClass(String),

    #[error("Cannot decode {value:?} as {kind}: {reason}")]
    Decode {
        kind: FolderType,
        value: String,
        reason: String,
    },

    #[error("Cannot encode {value} for a {kind} folder")]
    Encode { kind: FolderType, value: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),
}

pub type Result<T> = std::result::Result<T, EccoError>;
