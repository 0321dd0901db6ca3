use std::sync::OnceLock;

use cipher_algebra::{Session, Value};
use proptest::prelude::*;

fn session() -> &'static Session {
    static SESSION: OnceLock<Session> = OnceLock::new();
    SESSION.get_or_init(|| Session::builder().seed(31).build().unwrap())
}

fn decrypt_f64(ct: &cipher_algebra::Ciphertext) -> f64 {
    session().decrypt(ct).unwrap().as_f64().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn integer_arithmetic_is_exact(a in -500i64..500, b in -500i64..500) {
        let s = session();
        let x = s.encrypt(a).unwrap();
        let y = s.encrypt(b).unwrap();
        prop_assert_eq!(s.decrypt(&(&x + &y).unwrap()).unwrap(), Value::Int(a + b));
        prop_assert_eq!(s.decrypt(&(&x - &y).unwrap()).unwrap(), Value::Int(a - b));
        prop_assert_eq!(s.decrypt(&(&x * &y).unwrap()).unwrap(), Value::Int(a * b));
    }

    #[test]
    fn float_arithmetic_tracks_plain_arithmetic(a in -100.0f64..100.0, b in -100.0f64..100.0) {
        let s = session();
        let x = s.encrypt(a).unwrap();
        let y = s.encrypt(b).unwrap();
        prop_assert!((decrypt_f64(&(&x + &y).unwrap()) - (a + b)).abs() < 1e-5);
        prop_assert!((decrypt_f64(&(&x * &y).unwrap()) - a * b).abs() < 1e-3);
    }

    #[test]
    fn native_operands_commute(a in -50.0f64..50.0, k in -50.0f64..50.0) {
        let s = session();
        let x = s.encrypt(a).unwrap();
        let lhs = decrypt_f64(&(k * &x).unwrap());
        let rhs = decrypt_f64(&(&x * k).unwrap());
        prop_assert!((lhs - rhs).abs() < 1e-4);
        prop_assert!((decrypt_f64(&(k + &x).unwrap()) - (k + a)).abs() < 1e-5);
        prop_assert!((decrypt_f64(&(k - &x).unwrap()) - (k - a)).abs() < 1e-5);
    }

    #[test]
    fn vector_addition_is_slotwise(values in prop::collection::vec(-10.0f64..10.0, 1..16)) {
        let s = session();
        let x = s.encrypt(values.clone()).unwrap();
        let doubled = s.decrypt(&(&x + &x).unwrap()).unwrap();
        let doubled = doubled.as_slice().unwrap();
        prop_assert_eq!(doubled.len(), values.len());
        for (got, want) in doubled.iter().zip(&values) {
            prop_assert!((got - 2.0 * want).abs() < 1e-5);
        }
    }
}
