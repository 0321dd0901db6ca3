use approx::assert_abs_diff_eq;
use cipher_algebra::{
    CiphertextData, EncryptionParameters, HeError, KeySet, Session, Value, ValueKind,
};

fn saved_session(seed: u64) -> (Session, Vec<u8>, Vec<u8>) {
    let session = Session::builder().rotations(&[1]).seed(seed).build().unwrap();
    let params = bincode::serialize(session.parameters()).unwrap();
    let keys = bincode::serialize(&session.key_set()).unwrap();
    (session, params, keys)
}

fn reload(params: &[u8], keys: &[u8]) -> Session {
    let params: EncryptionParameters = bincode::deserialize(params).unwrap();
    let keys: KeySet = bincode::deserialize(keys).unwrap();
    Session::builder().restore(params, keys).unwrap()
}

#[test]
fn saved_ciphertexts_decrypt_in_a_reloaded_session() {
    let (session, params, keys) = saved_session(51);
    let x = session.encrypt(vec![1.5, -2.0, 0.25]).unwrap();
    let y = (&x * 2.0).unwrap();
    let bytes = bincode::serialize(&y.to_data()).unwrap();

    let reloaded = reload(&params, &keys);
    assert_eq!(reloaded.id(), session.id());
    assert_eq!(reloaded.parameters(), session.parameters());

    let data: CiphertextData = bincode::deserialize(&bytes).unwrap();
    let restored = reloaded.restore_ciphertext(data).unwrap();
    assert_eq!(restored.level(), y.level());
    assert_eq!(restored.kind(), ValueKind::Vector { len: 3 });
    let decrypted = reloaded.decrypt(&restored).unwrap();
    for (got, want) in decrypted.as_slice().unwrap().iter().zip([3.0, -4.0, 0.5]) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-3);
    }

    // Restored handles keep composing, rotations included.
    let rolled = (&restored + &reloaded.encrypt(1_i64).unwrap()).unwrap().rotate(1).unwrap();
    let decrypted = reloaded.decrypt(&rolled).unwrap();
    assert_abs_diff_eq!(decrypted.as_slice().unwrap()[1], 4.0, epsilon = 1e-3);
}

#[test]
fn reloaded_session_decrypts_ciphertexts_of_the_original() {
    let (session, params, keys) = saved_session(52);
    let reloaded = reload(&params, &keys);

    let product = (&session.encrypt(6_i64).unwrap() * 7_i64).unwrap();
    let restored = reloaded.restore_ciphertext(product.to_data()).unwrap();
    assert_eq!(reloaded.decrypt(&restored).unwrap(), Value::Int(42));
}

#[test]
fn foreign_ciphertext_data_is_rejected() {
    let (session, _, _) = saved_session(53);
    let other = Session::builder().seed(53).build().unwrap();
    let data = other.encrypt(1.0).unwrap().to_data();
    assert_eq!(
        session.restore_ciphertext(data),
        Err(HeError::KeyMismatch {
            expected: session.id(),
            found: other.id()
        })
    );
}

#[test]
fn malformed_ciphertext_data_is_rejected() {
    let (session, _, _) = saved_session(54);
    let x = session.encrypt(1.0).unwrap();

    let mut data = x.to_data();
    data.components.truncate(1);
    assert!(matches!(
        session.restore_ciphertext(data),
        Err(HeError::Parameter { .. })
    ));

    let mut data = x.to_data();
    data.level = x.level() - 1;
    assert!(matches!(
        session.restore_ciphertext(data),
        Err(HeError::Parameter { .. })
    ));

    let mut data = x.to_data();
    data.scale = f64::NAN;
    assert!(matches!(
        session.restore_ciphertext(data),
        Err(HeError::Parameter { .. })
    ));
}

#[test]
fn keys_of_another_chain_are_refused() {
    let (_, _, keys) = saved_session(55);
    let deeper = Session::builder().max_multiplicative_depth(3).build().unwrap();
    let keys: KeySet = bincode::deserialize(&keys).unwrap();
    assert!(matches!(
        Session::builder().restore(deeper.parameters().clone(), keys),
        Err(HeError::Parameter { .. })
    ));
}

#[test]
fn values_survive_serialization() {
    for value in [Value::Int(-3), Value::Float(0.5), Value::Vector(vec![1.0, 2.0])] {
        let bytes = bincode::serialize(&value).unwrap();
        assert_eq!(bincode::deserialize::<Value>(&bytes).unwrap(), value);
    }
}
