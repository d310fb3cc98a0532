use serde::{Deserialize, Serialize};

/// Kind of a declaration, mirroring the protocol's closed set of symbol kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Kind {
    File,
    Module,
    Namespace,
    Package,
    Class,
    Method,
    Property,
    Field,
    Constructor,
    Enum,
    Interface,
    Function,
    Variable,
    Constant,
    String,
    Number,
    Boolean,
    Array,
    Object,
    Key,
    Null,
    EnumMember,
    Struct,
    Event,
    Operator,
    TypeParameter,
}

impl Kind {
    /// Maps a protocol symbol kind onto the closed enum; unknown values yield `None`.
    pub fn from_lsp(kind: lsp_types::SymbolKind) -> Option<Self> {
        use lsp_types::SymbolKind as K;

        let kind = match kind {
            K::FILE => Kind::File,
            K::MODULE => Kind::Module,
            K::NAMESPACE => Kind::Namespace,
            K::PACKAGE => Kind::Package,
            K::CLASS => Kind::Class,
            K::METHOD => Kind::Method,
            K::PROPERTY => Kind::Property,
            K::FIELD => Kind::Field,
            K::CONSTRUCTOR => Kind::Constructor,
            K::ENUM => Kind::Enum,
            K::INTERFACE => Kind::Interface,
            K::FUNCTION => Kind::Function,
            K::VARIABLE => Kind::Variable,
            K::CONSTANT => Kind::Constant,
            K::STRING => Kind::String,
            K::NUMBER => Kind::Number,
            K::BOOLEAN => Kind::Boolean,
            K::ARRAY => Kind::Array,
            K::OBJECT => Kind::Object,
            K::KEY => Kind::Key,
            K::NULL => Kind::Null,
            K::ENUM_MEMBER => Kind::EnumMember,
            K::STRUCT => Kind::Struct,
            K::EVENT => Kind::Event,
            K::OPERATOR => Kind::Operator,
            K::TYPE_PARAMETER => Kind::TypeParameter,
            _ => return None,
        };
        Some(kind)
    }
}

/// How to launch the language server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Executable, resolved on `PATH`
    pub command: String,
    /// Command-line arguments; the default turns on verbose logging
    pub args: Vec<String>,
    /// Optional initialization options sent with `initialize`
    pub initialization_options: Option<serde_json::Value>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: "gopls".to_string(),
            args: vec!["-vv".to_string()],
            initialization_options: None,
        }
    }
}
