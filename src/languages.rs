//! Language configuration for compilation and execution

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;

/// A supported language. Anything outside this set is rejected before any
/// filesystem or process work happens. Wire names and aliases are handled
/// by the `FromStr` impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cpp,
    Java,
    Python,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "c" => Ok(Language::C),
            "cpp" | "c++" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "python" | "py" | "python3" => Ok(Language::Python),
            _ => Err(()),
        }
    }
}

/// Compile/run recipe for one language
#[derive(Debug, Clone)]
pub struct ToolchainSpec {
    /// Default name of the materialized source file (e.g. "main.cpp").
    /// For Java the effective name comes from the discovered public class.
    pub source_file: String,
    /// Compile command template (None for interpreted languages)
    pub compile_command: Option<Vec<String>>,
    /// Run command template
    pub run_command: Vec<String>,
    /// Glob patterns of generated files removed at workspace release
    pub artifacts: Vec<String>,
}

/// Per-job values substituted into command templates
#[derive(Debug, Clone)]
pub struct TemplateVars {
    /// Materialized source file name
    pub source: String,
    /// Workspace-scoped binary name for compiled languages
    pub binary: String,
    /// Java public class name, when discovered
    pub class: Option<String>,
}

impl TemplateVars {
    fn expand(&self, token: &str) -> String {
        let mut out = token.replace("{source}", &self.source);
        out = out.replace("{binary}", &self.binary);
        if let Some(class) = &self.class {
            out = out.replace("{class}", class);
        }
        out
    }

    /// Expand placeholders in every token of a command template
    pub fn render(&self, template: &[String]) -> Vec<String> {
        template.iter().map(|t| self.expand(t)).collect()
    }
}

impl ToolchainSpec {
    /// The effective source file name for a job. Java sources must declare a
    /// public type whose name dictates the file name; everything else uses
    /// the configured default.
    pub fn source_file_name(&self, language: Language, source_code: &str) -> Option<String> {
        match language {
            Language::Java => {
                discover_public_class(source_code).map(|class| format!("{}.java", class))
            }
            _ => Some(self.source_file.clone()),
        }
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawToolchainSpec {
    source_file: String,
    compile_command: Option<String>,
    run_command: String,
    #[serde(default)]
    artifacts: Vec<String>,
}

/// Static table mapping each language to its toolchain recipe
#[derive(Debug, Clone)]
pub struct ToolchainRegistry {
    specs: HashMap<Language, ToolchainSpec>,
}

impl ToolchainRegistry {
    /// Registry built from the recipes embedded at compile time
    pub fn builtin() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml_str(content)
    }

    /// Parse a registry from a TOML table keyed by language name
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw: HashMap<String, RawToolchainSpec> = toml::from_str(content)?;

        let mut specs = HashMap::new();
        for (name, raw) in raw {
            let language = name
                .parse::<Language>()
                .map_err(|_| anyhow::anyhow!("Unknown language in toolchain table: {}", name))?;
            let spec = ToolchainSpec {
                source_file: raw.source_file,
                compile_command: raw.compile_command.map(|cmd| into_command(&cmd)),
                run_command: into_command(&raw.run_command),
                artifacts: raw.artifacts,
            };
            specs.insert(language, spec);
        }

        Ok(Self { specs })
    }

    /// Look up the recipe for a language
    pub fn lookup(&self, language: Language) -> Option<&ToolchainSpec> {
        self.specs.get(&language)
    }
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

/// Scan Java source for the declared public type and return its name.
///
/// Matches `public [modifiers] class|interface|enum|record Name`. Returns
/// None when no public type exists, which the caller rejects before ever
/// invoking javac.
pub fn discover_public_class(source: &str) -> Option<String> {
    let tokens = source
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty());

    let mut saw_public = false;
    let mut saw_kind = false;
    for token in tokens {
        if saw_kind {
            return Some(token.to_string());
        }
        match token {
            "public" => saw_public = true,
            "class" | "interface" | "enum" | "record" if saw_public => saw_kind = true,
            "final" | "abstract" | "strictfp" | "sealed" if saw_public => {}
            _ => saw_public = false,
        }
    }
    None
}
