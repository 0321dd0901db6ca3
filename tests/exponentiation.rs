use std::sync::OnceLock;

use approx::assert_relative_eq;
use cipher_algebra::{HeError, RelinearizationPolicy, Session, Value};

fn session() -> &'static Session {
    static SESSION: OnceLock<Session> = OnceLock::new();
    SESSION.get_or_init(|| Session::with_depth(3, 10).unwrap())
}

fn deferred_session() -> &'static Session {
    static SESSION: OnceLock<Session> = OnceLock::new();
    SESSION.get_or_init(|| {
        Session::builder()
            .max_multiplicative_depth(3)
            .precision_hint(10)
            .relinearization(RelinearizationPolicy::Deferred)
            .seed(5)
            .build()
            .unwrap()
    })
}

macro_rules! pow_cases {
    ($($exp:literal),*) => {
        paste::paste! {
            $(
                #[test]
                fn [<float_pow_ $exp>]() {
                    let s = session();
                    let x = s.encrypt(1.5).unwrap();
                    let y = x.pow($exp).unwrap();
                    let got = s.decrypt(&y).unwrap().as_f64().unwrap();
                    assert_relative_eq!(got, 1.5f64.powi($exp), max_relative = 1e-2);
                }

                #[test]
                fn [<int_pow_ $exp>]() {
                    let s = session();
                    let x = s.encrypt(3_i64).unwrap();
                    let y = x.pow($exp).unwrap();
                    assert_eq!(s.decrypt(&y).unwrap(), Value::Int(3i64.pow($exp)));
                }

                #[test]
                fn [<deferred_pow_ $exp>]() {
                    let s = deferred_session();
                    let x = s.encrypt(1.5).unwrap();
                    let got = s.decrypt(&x.pow($exp).unwrap()).unwrap().as_f64().unwrap();
                    assert_relative_eq!(got, 1.5f64.powi($exp), max_relative = 1e-2);
                }
            )*
        }
    };
}

pow_cases!(0, 1, 2, 5, 8);

#[test]
fn pow_consumes_ceil_log2_levels() {
    let s = session();
    let x = s.encrypt(1.5).unwrap();
    let top = x.level();
    assert_eq!(x.pow(1).unwrap().level(), top);
    assert_eq!(x.pow(2).unwrap().level(), top - 1);
    assert_eq!(x.pow(3).unwrap().level(), top - 2);
    assert_eq!(x.pow(8).unwrap().level(), top - 3);
}

#[test]
fn pow_zero_of_a_vector_is_all_ones() {
    let s = session();
    let x = s.encrypt(vec![2.0, -3.0]).unwrap();
    let one = s.decrypt(&x.pow(0).unwrap()).unwrap();
    let slots = one.as_slice().unwrap();
    assert_eq!(slots.len(), 2);
    for slot in slots {
        assert_relative_eq!(*slot, 1.0, max_relative = 1e-3);
    }
}

#[test]
fn insufficient_depth_fails_before_any_work() {
    let s = session();
    let x = s.encrypt(1.5).unwrap();
    assert_eq!(
        x.pow(9),
        Err(HeError::DepthExhausted {
            required: 4,
            available: 3
        })
    );

    let low = x.lower_to_level(1).unwrap();
    assert_eq!(
        low.pow(3),
        Err(HeError::DepthExhausted {
            required: 2,
            available: 1
        })
    );
    assert!(low.pow(2).is_ok());
}
