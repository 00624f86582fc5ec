use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const CONTEXT_ELDER: &str = "Orang Tua/Simbah";
pub const CONTEXT_PEER: &str = "Teman Sebaya";
pub const CONTEXT_CHILD: &str = "Anak Kecil";

/// Seed contexts every session starts with, in display order.
pub const DEFAULT_CONTEXTS: [&str; 3] = [CONTEXT_ELDER, CONTEXT_PEER, CONTEXT_CHILD];

/// Javanese speech level (unggah-ungguh), from least to most formal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Register {
    Ngoko,
    KramaMadya,
    KramaAlus,
    /// A level name the model used that is not one of the three above,
    /// kept verbatim (e.g. "Ngoko Alus").
    Other(String),
}

impl Register {
    pub fn as_str(&self) -> &str {
        match self {
            Register::Ngoko => "Ngoko",
            Register::KramaMadya => "Krama Madya",
            Register::KramaAlus => "Krama Alus",
            Register::Other(label) => label,
        }
    }

    /// Formality rank of the known levels. `Other` has no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Register::Ngoko => Some(0),
            Register::KramaMadya => Some(1),
            Register::KramaAlus => Some(2),
            Register::Other(_) => None,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Ngoko" => Register::Ngoko,
            "Krama Madya" => Register::KramaMadya,
            "Krama Alus" => Register::KramaAlus,
            other => Register::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Register {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// The model is authoritative for the level, so unknown names are kept instead of rejected.
impl<'de> Deserialize<'de> for Register {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RegisterVisitor;

        impl<'de> Visitor<'de> for RegisterVisitor {
            type Value = Register;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a Javanese speech level name")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Register, E> {
                Ok(Register::parse(value))
            }
        }

        deserializer.deserialize_str(RegisterVisitor)
    }
}

/// Who is being addressed. An open label; the seeds live in [`DEFAULT_CONTEXTS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(String);

impl Context {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Context {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// Ordered, duplicate-free set of contexts. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSet {
    contexts: Vec<Context>,
}

impl ContextSet {
    /// Builds a set from `seed`, dropping blanks and duplicates. Falls back to
    /// [`DEFAULT_CONTEXTS`] when nothing usable is left.
    pub fn with_seed<I, S>(seed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self {
            contexts: Vec::new(),
        };
        for label in seed {
            set.insert(label.as_ref());
        }
        if set.contexts.is_empty() {
            return Self::default();
        }
        set
    }

    pub fn contains(&self, label: &str) -> bool {
        self.contexts.iter().any(|c| c.label() == label)
    }

    /// Appends `label` (trimmed) if it is non-blank and not present yet.
    /// Returns the stored context, or `None` for a blank label.
    pub fn insert(&mut self, label: &str) -> Option<Context> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        if let Some(existing) = self.contexts.iter().find(|c| c.label() == label) {
            return Some(existing.clone());
        }
        let context = Context::new(label);
        self.contexts.push(context.clone());
        Some(context)
    }

    pub fn first(&self) -> &Context {
        &self.contexts[0]
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }
}

impl Default for ContextSet {
    fn default() -> Self {
        Self {
            contexts: DEFAULT_CONTEXTS.iter().map(|l| Context::new(*l)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_text: String,
    pub level: Register,
    pub explanation: String,
}

/// Canned scenario used to request an example sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Situation {
    pub id: &'static str,
    pub label: &'static str,
    pub prompt_seed: &'static str,
}

pub const SITUATIONS: [Situation; 5] = [
    Situation {
        id: "sungkeman",
        label: "Sungkeman",
        prompt_seed: "Saya memohon maaf lahir dan batin atas segala kesalahan saya kepada Bapak dan Ibu.",
    },
    Situation {
        id: "izin_pergi",
        label: "Izin Pergi",
        prompt_seed: "Bapak, saya minta izin mau pergi ke rumah teman sebentar untuk kerja kelompok.",
    },
    Situation {
        id: "tanya_kabar",
        label: "Tanya Kabar",
        prompt_seed: "Halo kawan, apa kabarmu hari ini? Semoga sehat selalu ya.",
    },
    Situation {
        id: "kabar_duka",
        label: "Kabar Duka",
        prompt_seed: "Saya turut berduka cita sedalam-dalamnya atas meninggalnya kakek kamu. Semoga beliau tenang di sana.",
    },
    Situation {
        id: "calon_mertua",
        label: "Calon Mertua",
        prompt_seed: "Selamat sore Bapak, perkenalkan saya teman dekat putri Bapak dan ingin bersilaturahmi.",
    },
];

pub fn find_situation(id: &str) -> Option<&'static Situation> {
    SITUATIONS.iter().find(|s| s.id == id)
}
