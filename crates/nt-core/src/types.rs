use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::title;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The fixed allow-list of roster members.
///
/// There is no account system: these three names *are* the identity model,
/// and each of them owns one Notion workspace the engine syncs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum User {
    David,
    Adam,
    Gustav,
}

impl User {
    /// All users in fixed priority order. Selection fields are always
    /// serialized in this order so repeated syncs converge byte-for-byte.
    pub const ALL: [User; 3] = [User::David, User::Adam, User::Gustav];

    /// Single-letter token used inside remote selection fields.
    pub fn letter(&self) -> char {
        match self {
            User::David => 'D',
            User::Adam => 'A',
            User::Gustav => 'G',
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            User::David => "David",
            User::Adam => "Adam",
            User::Gustav => "Gustav",
        }
    }

    pub fn from_letter(c: char) -> Option<User> {
        match c.to_ascii_uppercase() {
            'D' => Some(User::David),
            'A' => Some(User::Adam),
            'G' => Some(User::Gustav),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<User> {
        Self::ALL
            .into_iter()
            .find(|u| u.display_name().eq_ignore_ascii_case(name.trim()))
    }
}

// ---------------------------------------------------------------------------
// SelectionSet
// ---------------------------------------------------------------------------

/// The set of users who have claimed a lecture.
///
/// Replaces the ad-hoc letter-string splicing the remote field otherwise
/// invites: parsing tolerates any order and whitespace, while serialization
/// is always `"D, A, G"` priority order, so a reconcile that round-trips a
/// remote field without a real change produces the identical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionSet {
    mask: u8,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a remote selection field such as `"A,  d"`.
    ///
    /// Unknown letters are dropped rather than rejected: a stray token in a
    /// human-edited Notion cell must not poison the whole sync run.
    pub fn parse(field: &str) -> Self {
        let mut set = Self::new();
        for token in field.split(',') {
            for c in token.trim().chars() {
                if let Some(user) = User::from_letter(c) {
                    set.insert(user);
                }
            }
        }
        set
    }

    fn bit(user: User) -> u8 {
        match user {
            User::David => 0b001,
            User::Adam => 0b010,
            User::Gustav => 0b100,
        }
    }

    pub fn contains(&self, user: User) -> bool {
        self.mask & Self::bit(user) != 0
    }

    /// Idempotent add.
    pub fn insert(&mut self, user: User) {
        self.mask |= Self::bit(user);
    }

    /// Idempotent remove.
    pub fn remove(&mut self, user: User) {
        self.mask &= !Self::bit(user);
    }

    /// Apply a toggle, returning `true` when the set actually changed.
    pub fn set(&mut self, user: User, selected: bool) -> bool {
        let before = self.mask;
        if selected {
            self.insert(user);
        } else {
            self.remove(user);
        }
        self.mask != before
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = User> + '_ {
        User::ALL.into_iter().filter(|u| self.contains(*u))
    }
}

impl std::fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letters: Vec<String> = self.iter().map(|u| u.letter().to_string()).collect();
        write!(f, "{}", letters.join(", "))
    }
}

impl std::str::FromStr for SelectionSet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for SelectionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SelectionSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SelectionSet::parse(&s))
    }
}

// ---------------------------------------------------------------------------
// Lecture
// ---------------------------------------------------------------------------

/// A lecture in the shared local roster. The roster store owns these; the
/// sync engine reads them and never deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lecture {
    pub id: Uuid,
    pub lecture_number: u32,
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub selections: SelectionSet,
}

impl Lecture {
    pub fn new(lecture_number: u32, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lecture_number,
            title: title.into(),
            date: None,
            time: None,
            selections: SelectionSet::new(),
        }
    }

    /// The display title used in remote workspaces: `"12. Kardiologi"`.
    pub fn numbered_title(&self) -> String {
        format!("{}. {}", self.lecture_number, self.canonical_title())
    }

    /// The title with any leading `"N. "` prefix stripped. Human-entered
    /// roster titles sometimes already carry a number.
    pub fn canonical_title(&self) -> &str {
        title::canonical_title(&self.title)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
