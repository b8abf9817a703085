// ============================================================
// Layer 3: Special Tokens
// ============================================================
// Every vocabulary (source and target) reserves the same four
// ids at the front. Padding is 0 so that post-padded batches
// can be masked with a single comparison.

/// Index into a fixed vocabulary.
pub type TokenId = u32;

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const START_TOKEN: &str = "<s>";
pub const END_TOKEN: &str = "</s>";

pub const PAD_ID: TokenId = 0;
pub const UNK_ID: TokenId = 1;
pub const START_ID: TokenId = 2;
pub const END_ID: TokenId = 3;

/// Specials in id order. Vocabulary builders append corpus words after these.
pub const SPECIAL_TOKENS: [(&str, TokenId); 4] = [
    (PAD_TOKEN, PAD_ID),
    (UNK_TOKEN, UNK_ID),
    (START_TOKEN, START_ID),
    (END_TOKEN, END_ID),
];
