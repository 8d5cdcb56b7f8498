use std::io::Cursor;

use proptest::prelude::*;
use spsscrypt_crypto::EncodedPassword;
use spsscrypt_reader::{Corruption, EncryptedFile, FileType, Magic, StreamError};
use spsscrypt_testkit::{
    encrypt_container, encrypt_container_unpadded, sample_payload, truncate_ciphertext,
};

fn decrypt_all(bytes: Vec<u8>, password: &[u8]) -> (Vec<u8>, Result<(), StreamError>) {
    let file = EncryptedFile::new(Cursor::new(bytes), "prop.sav").unwrap();
    let mut reader = file.unlock(password).unwrap();
    let mut out = Vec::new();
    let mut buf = [0u8; 61];
    loop {
        let n = reader.read_plaintext(&mut buf);
        out.extend_from_slice(&buf[..n]);
        if n == 0 {
            break;
        }
    }
    (out, reader.close())
}

fn payload() -> impl Strategy<Value = Vec<u8>> {
    (
        prop_oneof![
            Just(Magic::SystemV2),
            Just(Magic::SystemV3),
            Just(Magic::Syntax),
            Just(Magic::Zip),
        ],
        proptest::collection::vec(any::<u8>(), 16..1500),
    )
        .prop_map(|(magic, tail)| {
            let mut p = sample_payload(magic, 0);
            p.extend_from_slice(&tail);
            p
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_any_password(
        password in proptest::collection::vec(any::<u8>(), 1..=10),
        plaintext in payload(),
    ) {
        let bytes = encrypt_container(&password, &plaintext, FileType::Data);
        let (out, closed) = decrypt_all(bytes, &password);
        prop_assert_eq!(out, plaintext);
        prop_assert!(closed.is_ok());
    }

    #[test]
    fn encoded_and_plain_passwords_agree(
        password in proptest::collection::vec(1u8..=255, 1..=10),
        index in any::<u64>(),
    ) {
        let plaintext = sample_payload(Magic::SystemV2, 64);
        let bytes = encrypt_container(&password, &plaintext, FileType::Data);
        let encoded = EncodedPassword::from_plaintext(&password).variant(index);

        let (via_plain, _) = decrypt_all(bytes.clone(), &password);
        let (via_encoded, _) = decrypt_all(bytes, encoded.as_bytes());
        prop_assert_eq!(&via_plain, &plaintext);
        prop_assert_eq!(&via_encoded, &plaintext);
    }

    #[test]
    fn truncated_ciphertext_fails_close(
        plaintext in payload(),
        cut in 32usize..1600,
    ) {
        let padded_len = (plaintext.len() / 16 + 1) * 16;
        prop_assume!(cut % 16 != 0 && cut < padded_len);

        let bytes = truncate_ciphertext(encrypt_container(b"pspp", &plaintext, FileType::Data), cut);
        let (out, closed) = decrypt_all(bytes, b"pspp");

        let whole = cut - cut % 16;
        prop_assert_eq!(&out[..], &plaintext[..whole]);
        match closed {
            Err(StreamError::Corrupt(Corruption::TruncatedBlock { overhang })) => {
                prop_assert_eq!(overhang, cut % 16);
            }
            other => prop_assert!(false, "unexpected close result {:?}", other),
        }
    }

    #[test]
    fn bad_padding_fails_close(
        blocks in 2usize..40,
        last in prop_oneof![Just(0u8), 17u8..=255],
    ) {
        let mut plaintext = sample_payload(Magic::SystemV3, blocks * 16);
        *plaintext.last_mut().unwrap() = last;

        let bytes = encrypt_container_unpadded(b"pspp", &plaintext, FileType::Data);
        let (out, closed) = decrypt_all(bytes, b"pspp");

        prop_assert!(out.len() < plaintext.len());
        let err = closed.unwrap_err();
        prop_assert_eq!(err.errno(), libc::EIO);
    }

    #[test]
    fn wrong_password_is_harmless(
        right in proptest::collection::vec(any::<u8>(), 1..=10),
        wrong in proptest::collection::vec(any::<u8>(), 1..=10),
    ) {
        let key_of = |p: &[u8]| {
            let mut k = p.to_vec();
            while k.last() == Some(&0) {
                k.pop();
            }
            k
        };
        prop_assume!(key_of(&right) != key_of(&wrong));

        let plaintext = sample_payload(Magic::Zip, 200);
        let bytes = encrypt_container(&right, &plaintext, FileType::Viewer);
        let file = EncryptedFile::new(Cursor::new(bytes), "prop.spv").unwrap();

        let file = match file.unlock_literal(&wrong) {
            Ok(_) => return Err(TestCaseError::fail("wrong password accepted")),
            Err(file) => file,
        };
        prop_assert!(file.unlock_literal(&right).is_ok());
    }
}
