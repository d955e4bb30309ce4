//! Map common spark words to opcodes.

use crate::symbols::Opcode;

/// Lower-case keyword to opcode.
pub const OP_WORD_MAP: [(&str, Opcode); 15] = [
    ("ignition", Opcode::Init),
    ("key", Opcode::Init),
    ("start", Opcode::Init),
    ("initialise", Opcode::Init),
    ("fire-up", Opcode::Forge),
    ("spin-up", Opcode::Spiral),
    ("run", Opcode::Flow),
    ("breath", Opcode::Flow),
    ("live", Opcode::Sync),
    ("beat", Opcode::Cycle),
    ("initiate", Opcode::Init),
    ("engage", Opcode::Sync),
    ("arm", Opcode::Mesh),
    ("stage", Opcode::Cycle),
    ("prepare", Opcode::Bound),
];

/// Return the opcode for a spark word, ignoring case.
pub fn op_from_word(word: &str) -> Option<Opcode> {
    let lowered = word.trim().to_lowercase();
    OP_WORD_MAP
        .iter()
        .find(|(keyword, _)| *keyword == lowered)
        .map(|(_, op)| *op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_words_resolve() {
        assert_eq!(op_from_word("Ignition"), Some(Opcode::Init));
        assert_eq!(op_from_word("spin-up"), Some(Opcode::Spiral));
        assert_eq!(op_from_word("ENGAGE"), Some(Opcode::Sync));
    }

    #[test]
    fn unknown_word_is_none() {
        assert_eq!(op_from_word("teleport"), None);
    }
}
