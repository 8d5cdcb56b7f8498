use crate::block::Block;

/// Number of PKCS#7 padding bytes (1..=16) at the end of `block`, or `None`
/// if the padding is malformed.
pub fn pkcs7_padding_len(block: &Block) -> Option<usize> {
    let pad = block[block.len() - 1] as usize;
    if !(1..=block.len()).contains(&pad) {
        return None;
    }
    block[block.len() - pad..]
        .iter()
        .all(|b| *b as usize == pad)
        .then_some(pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_padding() {
        let mut block = [0xAAu8; 16];
        block[15] = 1;
        assert_eq!(pkcs7_padding_len(&block), Some(1));

        block[12..].fill(4);
        assert_eq!(pkcs7_padding_len(&block), Some(4));

        assert_eq!(pkcs7_padding_len(&[16u8; 16]), Some(16));
    }

    #[test]
    fn test_out_of_range() {
        let mut block = [0u8; 16];
        assert_eq!(pkcs7_padding_len(&block), None);
        block[15] = 0x11;
        assert_eq!(pkcs7_padding_len(&block), None);
        block[15] = 0xff;
        assert_eq!(pkcs7_padding_len(&block), None);
    }

    #[test]
    fn test_inconsistent_bytes() {
        let mut block = [0u8; 16];
        block[13..].copy_from_slice(&[3, 2, 3]);
        assert_eq!(pkcs7_padding_len(&block), None);
    }
}
