#[cfg(test)]
mod tests {
    use rand::Rng;
    use rayon::prelude::*;
    use rust_eigenda_primitives::{
        blob::Blob, errors::BlobError, helpers::pad_payload, payload::Payload, PolynomialForm,
    };

    const GETTYSBURG_ADDRESS_BYTES: &[u8] = "Fourscore and seven years ago our fathers brought forth, on this continent, a new nation, conceived in liberty, and dedicated to the proposition that all men are created equal. Now we are engaged in a great civil war, testing whether that nation, or any nation so conceived, and so dedicated, can long endure. We are met on a great battle-field of that war. We have come to dedicate a portion of that field, as a final resting-place for those who here gave their lives, that that nation might live. It is altogether fitting and proper that we should do this. But, in a larger sense, we cannot dedicate, we cannot consecrate—we cannot hallow—this ground. The brave men, living and dead, who struggled here, have consecrated it far above our poor power to add or detract. The world will little note, nor long remember what we say here, but it can never forget what they did here. It is for us the living, rather, to be dedicated here to the unfinished work which they who fought here have thus far so nobly advanced. It is rather for us to be here dedicated to the great task remaining before us—that from these honored dead we take increased devotion to that cause for which they here gave the last full measure of devotion—that we here highly resolve that these dead shall not have died in vain—that this nation, under God, shall have a new birth of freedom, and that government of the people, by the people, for the people, shall not perish from the earth.".as_bytes();

    #[test]
    fn test_round_trip_both_forms() {
        let payload = Payload::new(GETTYSBURG_ADDRESS_BYTES.to_vec());
        for form in [PolynomialForm::Eval, PolynomialForm::Coeff] {
            let blob = Blob::from_payload(&payload, form).unwrap();
            assert_eq!(blob.polynomial_form(), form);
            assert_eq!(blob.to_payload().unwrap(), payload);
        }
    }

    #[test]
    fn test_round_trip_random_payloads() {
        (0..50).into_par_iter().for_each(|_| {
            let mut rng = rand::thread_rng();
            let len = rng.gen_range(0..2048);
            let payload = Payload::new((0..len).map(|_| rng.gen::<u8>()).collect());
            for form in [PolynomialForm::Eval, PolynomialForm::Coeff] {
                let blob = Blob::from_payload(&payload, form).unwrap();
                assert!(blob.len_symbols().is_power_of_two());
                assert_eq!(blob.to_payload().unwrap(), payload);
            }
        });
    }

    #[test]
    fn test_empty_payload() {
        let payload = Payload::new(vec![]);
        for form in [PolynomialForm::Eval, PolynomialForm::Coeff] {
            let blob = Blob::from_payload(&payload, form).unwrap();
            assert_eq!(blob.len_symbols(), 1);
            assert_eq!(blob.to_payload().unwrap(), payload);
        }
    }

    #[test]
    fn test_get_bytes_round_trip_through_new() {
        let payload = Payload::new(b"some rollup batcher data".to_vec());
        for form in [PolynomialForm::Eval, PolynomialForm::Coeff] {
            let blob = Blob::from_payload(&payload, form).unwrap();
            let bytes = blob.get_bytes();
            assert_eq!(bytes.len(), blob.len_symbols() * 32);

            let rebuilt = Blob::new(&bytes, form).unwrap();
            assert_eq!(rebuilt, blob);
            assert_eq!(rebuilt.to_payload().unwrap(), payload);
        }
    }

    #[test]
    fn test_with_length_restores_trimmed_zeros() {
        let payload = Payload::new(vec![5u8; 100]);
        let blob = Blob::from_payload(&payload, PolynomialForm::Coeff).unwrap();
        let bytes = blob.get_bytes();

        // a store may drop trailing zero symbols; the dispersed length brings them back
        let mut trimmed = bytes.clone();
        while trimmed.len() > 32 && trimmed[trimmed.len() - 32..].iter().all(|b| *b == 0) {
            trimmed.truncate(trimmed.len() - 32);
        }
        let restored =
            Blob::with_length(&trimmed, blob.len_symbols(), PolynomialForm::Coeff).unwrap();
        assert_eq!(restored, blob);
        assert_eq!(restored.to_payload().unwrap(), payload);
    }

    #[test]
    fn test_new_rejects_non_canonical_bytes() {
        let err = Blob::new(&[0xff; 64], PolynomialForm::Coeff).expect_err("bad element");
        assert!(matches!(err, BlobError::InvalidBlobBytes(_)));

        let err = Blob::new(&GETTYSBURG_ADDRESS_BYTES[0..64], PolynomialForm::Eval)
            .expect_err("bad element");
        assert!(matches!(err, BlobError::InvalidBlobBytes(_)));
    }

    #[test]
    fn test_to_payload_names_failing_stage() {
        // a valid field element array whose header claims an unsupported version
        let mut bytes = vec![0u8; 64];
        bytes[1] = 7;
        let blob = Blob::new(&bytes, PolynomialForm::Eval).unwrap();
        let err = blob.to_payload().expect_err("unknown version");
        assert!(matches!(err, BlobError::Decode(_)));

        // the padding of the body is broken
        let mut bytes = vec![0u8; 32];
        bytes[2..6].copy_from_slice(&31u32.to_be_bytes());
        bytes.extend_from_slice(&pad_payload(&[1u8; 31]));
        bytes[32] = 0x01;
        let blob = Blob::new(&bytes, PolynomialForm::Eval).unwrap();
        let err = blob.to_payload().expect_err("bad padding");
        assert!(matches!(err, BlobError::Decode(_)));
    }
}
