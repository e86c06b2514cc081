use rand::RngCore;

/// Mint an opaque affiliate tracking token. 16 random bytes hex-encoded is
/// plenty of entropy for a unique, unguessable link identifier.
pub fn mint_affiliate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_32_hex_chars() {
        let token = mint_affiliate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat_in_practice() {
        let tokens: HashSet<String> = (0..100).map(|_| mint_affiliate_token()).collect();
        assert_eq!(tokens.len(), 100);
    }
}
