use crate::error::StoreError;

pub const CODE_CAPACITY: usize = 0x40000;
pub const JUMP_TABLE_CAPACITY: usize = 0x4000;
pub const FUNCTION_CAPACITY: usize = 0x200;
pub const OBJECT_TYPE_CAPACITY: usize = 0x100;

/// Entry pointer written for a sub-script or function that has no body.
pub const NO_ENTRY: i32 = 0x3FFFF;

pub const TAG_VAR: i32 = 1;
pub const TAG_INTCONST: i32 = 2;
pub const TAG_STRCONST: i32 = 3;

pub const SOURCE_LITERAL: i32 = 0;
pub const SOURCE_REGISTER: i32 = 1;

pub const BLANK_OBJECT_NAME: &str = "BlankObject";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AddressMode {
    None = 0,
    Array = 1,
    EntityPlus = 2,
    EntityMinus = 3,
}

impl AddressMode {
    pub fn from_word(word: i32) -> Option<AddressMode> {
        match word {
            0 => Some(AddressMode::None),
            1 => Some(AddressMode::Array),
            2 => Some(AddressMode::EntityPlus),
            3 => Some(AddressMode::EntityMinus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubKind {
    Main,
    PlayerInteraction,
    Draw,
    Startup,
}

impl SubKind {
    pub const ALL: [SubKind; 4] = [
        SubKind::Main,
        SubKind::PlayerInteraction,
        SubKind::Draw,
        SubKind::Startup,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn marker(self) -> &'static str {
        match self {
            SubKind::Main => "subObjectMain",
            SubKind::PlayerInteraction => "subObjectPlayerInteraction",
            SubKind::Draw => "subObjectDraw",
            SubKind::Startup => "subObjectStartup",
        }
    }
}

/// Absolute offsets of a body in the code stream and the jump table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryPoint {
    pub code: usize,
    pub jump: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectScript {
    pub entries: [Option<EntryPoint>; 4],
    pub sprite_sheet: i32,
    pub frame_list_offset: usize,
    pub frame_count: usize,
    pub animation: Option<usize>,
}

impl ObjectScript {
    pub fn entry(&self, sub: SubKind) -> Option<EntryPoint> {
        self.entries[sub.index()]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptFunction {
    pub name: String,
    pub entry: Option<EntryPoint>,
}

#[derive(Debug, Clone)]
pub struct ScriptStore {
    pub code: Vec<i32>,
    pub jump_table: Vec<i32>,
    pub objects: Vec<ObjectScript>,
    pub functions: Vec<ScriptFunction>,
    pub type_names: Vec<String>,
}

impl Default for ScriptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptStore {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            jump_table: Vec::new(),
            objects: vec![ObjectScript::default(); OBJECT_TYPE_CAPACITY],
            functions: Vec::new(),
            type_names: vec![BLANK_OBJECT_NAME.to_string()],
        }
    }

    /// ClearScriptData: drops all compiled code and every registered name.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn push_code(&mut self, word: i32) -> Result<usize, StoreError> {
        if self.code.len() >= CODE_CAPACITY {
            return Err(StoreError::CodeExhausted);
        }
        self.code.push(word);
        Ok(self.code.len() - 1)
    }

    pub fn push_jump(&mut self, word: i32) -> Result<usize, StoreError> {
        if self.jump_table.len() >= JUMP_TABLE_CAPACITY {
            return Err(StoreError::JumpTableExhausted);
        }
        self.jump_table.push(word);
        Ok(self.jump_table.len() - 1)
    }

    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Returns the index of `name`, registering it when first seen. Indices
    /// already handed out never move.
    pub fn declare_function(&mut self, name: &str) -> Result<usize, StoreError> {
        if let Some(index) = self.function_index(name) {
            return Ok(index);
        }
        if self.functions.len() >= FUNCTION_CAPACITY {
            return Err(StoreError::FunctionsExhausted);
        }
        self.functions.push(ScriptFunction {
            name: name.to_string(),
            entry: None,
        });
        Ok(self.functions.len() - 1)
    }

    /// Registers an object type name. Spaces are dropped so that
    /// `TypeName[Blue Shield]` and `TypeName[BlueShield]` agree.
    pub fn register_type(&mut self, name: &str) -> Result<usize, StoreError> {
        if self.type_names.len() >= OBJECT_TYPE_CAPACITY {
            return Err(StoreError::ObjectTypesExhausted);
        }
        self.type_names.push(name.replace(' ', ""));
        Ok(self.type_names.len() - 1)
    }

    pub fn type_index(&self, label: &str) -> Option<usize> {
        let label = label.replace(' ', "");
        self.type_names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(&label))
    }

    pub fn object(&self, type_id: usize) -> Option<&ObjectScript> {
        self.objects.get(type_id)
    }
}

/// Number of words a packed string of `len` bytes occupies.
pub fn packed_words(len: usize) -> usize {
    len / 4 + 1
}

/// Packs the bytes of `text` big-endian, four to a word, followed by the
/// closing quote byte.
pub fn pack_string(text: &str) -> Vec<i32> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(b'"');
    bytes
        .chunks(4)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u32, |word, (i, &b)| word | (b as u32) << (24 - 8 * i))
                as i32
        })
        .collect()
}

pub fn unpack_string(words: &[i32], len: usize) -> String {
    let bytes: Vec<u8> = words
        .iter()
        .flat_map(|&w| (w as u32).to_be_bytes())
        .take(len)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_pack_with_trailing_quote() {
        let words = pack_string("Hi");
        assert_eq!(words, vec![0x4869_2200]);
        assert_eq!(unpack_string(&words, 2), "Hi");

        let words = pack_string("ABCD");
        assert_eq!(words.len(), packed_words(4));
        assert_eq!(words[0], 0x4142_4344);
        assert_eq!(words[1], 0x2200_0000);
        assert_eq!(unpack_string(&words, 4), "ABCD");

        assert_eq!(pack_string("").len(), packed_words(0));
    }

    #[test]
    fn functions_keep_their_first_index() {
        let mut store = ScriptStore::new();
        assert_eq!(store.declare_function("Spawn"), Ok(0));
        assert_eq!(store.declare_function("Other"), Ok(1));
        assert_eq!(store.declare_function("SPAWN"), Ok(0));
        assert_eq!(store.function_index("other"), Some(1));
    }

    #[test]
    fn type_names_ignore_spaces_and_case() {
        let mut store = ScriptStore::new();
        let id = store.register_type("Blue Shield").unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.type_index("blueshield"), Some(1));
        assert_eq!(store.type_index("Blue Shield"), Some(1));
        assert_eq!(store.type_index("BlankObject"), Some(0));
        assert_eq!(store.type_index("Missing"), None);
    }

    #[test]
    fn code_store_reports_exhaustion() {
        let mut store = ScriptStore::new();
        store.jump_table.resize(JUMP_TABLE_CAPACITY, 0);
        assert_eq!(store.push_jump(1), Err(StoreError::JumpTableExhausted));

        store.code.resize(CODE_CAPACITY - 1, 0);
        assert_eq!(store.push_code(7), Ok(CODE_CAPACITY - 1));
        assert_eq!(store.push_code(7), Err(StoreError::CodeExhausted));
        assert_eq!(store.code.len(), CODE_CAPACITY);
    }
}
