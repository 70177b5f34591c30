#[cfg(test)]
mod tests {
    use ark_bn254::Fr;
    use rust_eigenda_primitives::{
        consts::MAX_POLYNOMIAL_SIZE,
        errors::PolynomialError,
        helpers::pad_payload,
        polynomial::{PolynomialCoeffForm, PolynomialEvalForm},
    };
    const GETTYSBURG_ADDRESS_BYTES: &[u8] = "Fourscore and seven years ago our fathers brought forth, on this continent, a new nation, conceived in liberty, and dedicated to the proposition that all men are created equal. Now we are engaged in a great civil war, testing whether that nation, or any nation so conceived, and so dedicated, can long endure. We are met on a great battle-field of that war. We have come to dedicate a portion of that field, as a final resting-place for those who here gave their lives, that that nation might live. It is altogether fitting and proper that we should do this. But, in a larger sense, we cannot dedicate, we cannot consecrate—we cannot hallow—this ground. The brave men, living and dead, who struggled here, have consecrated it far above our poor power to add or detract. The world will little note, nor long remember what we say here, but it can never forget what they did here. It is for us the living, rather, to be dedicated here to the unfinished work which they who fought here have thus far so nobly advanced. It is rather for us to be here dedicated to the great task remaining before us—that from these honored dead we take increased devotion to that cause for which they here gave the last full measure of devotion—that we here highly resolve that these dead shall not have died in vain—that this nation, under God, shall have a new birth of freedom, and that government of the people, by the people, for the people, shall not perish from the earth.".as_bytes();

    #[test]
    fn test_from_bytes_be() {
        let data = pad_payload(
            vec![
                42, 212, 238, 227, 192, 237, 178, 128, 19, 108, 50, 204, 87, 81, 63, 120, 232, 27,
                116, 108, 74, 168, 109, 84, 89, 9, 6, 233, 144, 200, 125, 40,
            ]
            .as_slice(),
        );
        let poly = PolynomialCoeffForm::from_bytes_be(&data).unwrap();
        assert_eq!(poly.len(), 2);
        assert_eq!(poly.to_bytes_be(), data, "should be deserialized properly");

        let long_data = pad_payload(GETTYSBURG_ADDRESS_BYTES);
        let long_poly = PolynomialEvalForm::from_bytes_be(&long_data).unwrap();
        assert_eq!(long_poly.len(), 64, "48 elements padded to 64");
        assert_eq!(
            &long_poly.to_bytes_be()[0..long_data.len()],
            long_data.as_slice(),
            "should be deserialized properly"
        );
    }

    #[test]
    fn test_from_bytes_be_rejects_non_canonical() {
        let err = PolynomialCoeffForm::from_bytes_be(&[0xff; 64]).expect_err("not canonical");
        assert!(matches!(err, PolynomialError::InvalidFieldElement(_)));

        let err = PolynomialEvalForm::from_bytes_be(&GETTYSBURG_ADDRESS_BYTES[0..64])
            .expect_err("not canonical");
        assert!(matches!(err, PolynomialError::InvalidFieldElement(_)));
    }

    #[test]
    fn test_transform_form() {
        let data = pad_payload(GETTYSBURG_ADDRESS_BYTES);
        let poly_coeff = PolynomialCoeffForm::from_bytes_be(&data).unwrap();

        let poly_eval = poly_coeff.to_eval_form(poly_coeff.len()).unwrap();
        let poly_coeff_back = poly_eval.to_coeff_form(poly_eval.len()).unwrap();
        assert_eq!(poly_coeff_back, poly_coeff);
        assert_eq!(
            &poly_coeff_back.to_bytes_be()[0..data.len()],
            data.as_slice(),
            "start and finish bytes should be the same"
        );
    }

    #[test]
    fn test_transform_uses_blob_length() {
        let poly_coeff =
            PolynomialCoeffForm::new(vec![Fr::from(1u8), Fr::from(2u8), Fr::from(3u8)]).unwrap();
        assert_eq!(poly_coeff.len(), 4);

        // the domain grows to the blob length, never shrinks below the polynomial
        let poly_eval = poly_coeff.to_eval_form(16).unwrap();
        assert_eq!(poly_eval.len(), 16);
        let poly_eval = poly_coeff.to_eval_form(2).unwrap();
        assert_eq!(poly_eval.len(), 4);
        let poly_eval = poly_coeff.to_eval_form(5).unwrap();
        assert_eq!(poly_eval.len(), 8);

        // a constant polynomial evaluates to itself everywhere
        let constant = PolynomialCoeffForm::new(vec![Fr::from(9u8)]).unwrap();
        let evals = constant.to_eval_form(8).unwrap();
        assert!(evals.evaluations().iter().all(|e| *e == Fr::from(9u8)));

        let back = evals.to_coeff_form(8).unwrap();
        assert_eq!(back.get_at_index(0), Some(&Fr::from(9u8)));
        assert!(back.coeffs()[1..].iter().all(|c| *c == Fr::from(0u8)));
    }

    #[test]
    fn test_polynomial_lengths() {
        let poly_coeff =
            PolynomialCoeffForm::new(vec![Fr::from(1u8), Fr::from(2u8), Fr::from(3u8)]).unwrap();
        assert_eq!(
            poly_coeff.coeffs().len(),
            4,
            "poly should be padded to the next power of 2"
        );

        let poly_evals =
            PolynomialEvalForm::new(vec![Fr::from(1u8), Fr::from(2u8), Fr::from(3u8)]).unwrap();
        assert_eq!(
            poly_evals.evaluations().len(),
            4,
            "poly should be padded to the next power of 2"
        );

        let poly_coeff_large =
            PolynomialCoeffForm::new(vec![Fr::from(1u8); MAX_POLYNOMIAL_SIZE + 1]);
        assert_eq!(
            poly_coeff_large.err().unwrap(),
            PolynomialError::GenericError("Input size exceeds maximum polynomial size".to_string())
        );

        let poly_eval_large = PolynomialEvalForm::new(vec![Fr::from(1u8); MAX_POLYNOMIAL_SIZE + 1]);
        assert!(poly_eval_large.is_err());
    }

    #[test]
    fn test_is_empty() {
        // padding to a power of two means even an empty input holds one zero element
        let poly_coeff_from_empty = PolynomialCoeffForm::new(vec![]).unwrap();
        assert!(!poly_coeff_from_empty.is_empty());
        assert_eq!(poly_coeff_from_empty.len(), 1);

        let poly_eval_from_empty = PolynomialEvalForm::new(vec![]).unwrap();
        assert!(!poly_eval_from_empty.is_empty());
        assert_eq!(poly_eval_from_empty.len(), 1);
    }

    #[test]
    fn test_get_at_index() {
        let field_elements = vec![Fr::from(1u8), Fr::from(2u8), Fr::from(3u8)];
        let poly_coeff = PolynomialCoeffForm::new(field_elements).unwrap();

        assert_eq!(poly_coeff.get_at_index(0), Some(&Fr::from(1u8)));
        assert_eq!(poly_coeff.get_at_index(2), Some(&Fr::from(3u8)));
        assert_eq!(poly_coeff.get_at_index(3), Some(&Fr::from(0u8)), "padded zero");
        assert_eq!(poly_coeff.get_at_index(4), None);

        let large_poly_coeff = PolynomialCoeffForm::new(vec![Fr::from(42u8); 100]).unwrap();
        assert_eq!(large_poly_coeff.len(), 128);
        assert_eq!(large_poly_coeff.get_at_index(127), Some(&Fr::from(0u8)));
        assert_eq!(large_poly_coeff.get_at_index(128), None);
    }

    #[test]
    fn test_get_evaluation() {
        let field_elements = vec![Fr::from(5u8), Fr::from(10u8), Fr::from(15u8)];
        let poly_eval = PolynomialEvalForm::new(field_elements).unwrap();

        assert_eq!(poly_eval.get_evaluation(0), Some(&Fr::from(5u8)));
        assert_eq!(poly_eval.get_evaluation(3), Some(&Fr::from(0u8)));
        assert_eq!(poly_eval.get_evaluation(4), None);
    }
}
