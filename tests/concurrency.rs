use std::thread;

use cipher_algebra::{Session, Value};

#[test]
fn handles_are_shared_across_threads() {
    let session = Session::builder().seed(41).build().unwrap();
    let x = session.encrypt(3_i64).unwrap();

    let results: Vec<i64> = thread::scope(|scope| {
        let handles: Vec<_> = (1..=4_i64)
            .map(|k| {
                let (session, x) = (&session, &x);
                scope.spawn(move || {
                    let y = ((x * k).unwrap() + k).unwrap();
                    match session.decrypt(&y).unwrap() {
                        Value::Int(value) => value,
                        other => panic!("expected an integer, got {other:?}"),
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results, vec![4, 8, 12, 16]);
    assert_eq!(session.decrypt(&x).unwrap(), Value::Int(3));
}

#[test]
fn encryptors_move_to_other_threads() {
    let session = Session::builder().seed(42).build().unwrap();
    let encryptor = session.encryptor();
    let ct = thread::spawn(move || encryptor.encrypt(vec![1.0, 2.0]).unwrap())
        .join()
        .unwrap();
    let decrypted = session.decrypt(&ct).unwrap();
    let slots = decrypted.as_slice().unwrap();
    assert!((slots[0] - 1.0).abs() < 1e-6 && (slots[1] - 2.0).abs() < 1e-6);
}
