#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use cipher_algebra::{HeResult, Session, Value};
use tracing_subscriber::EnvFilter;

fn main() -> HeResult<()> {
    #[cfg(feature = "dhat-heap")]
    let _dhat = dhat::Profiler::new_heap();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Creating a depth-3 session...");
    let session = Session::builder()
        .max_multiplicative_depth(3)
        .precision_hint(20)
        .rotations(&[1])
        .build()?;
    println!("Parameters: {}", session.parameters());

    // y = 3x^2 + 2x + 1, evaluated on encrypted x.
    let x = session.encrypt(1.25)?;
    let y = ((&x.pow(2)? * 3.0)? + (&x * 2.0)?)?;
    let y = (y + 1.0)?;
    println!(
        "3x^2 + 2x + 1 at x = 1.25: {:?} (level {}, scale 2^{:.2})",
        session.decrypt(&y)?,
        y.level(),
        y.scale().log2()
    );

    let counts = session.encrypt(vec![1.0, 2.0, 3.0, 4.0])?;
    let weights = session.encode(vec![0.5, 0.25, 2.0, 1.0])?;
    let weighted = (&counts * &weights)?;
    if let Value::Vector(values) = session.decrypt(&weighted)? {
        println!("Weighted counts: {values:.3?}");
    }

    let rolled = counts.rotate(1)?;
    if let Value::Vector(values) = session.decrypt(&rolled)? {
        println!("Rolled by one: {:.3?}", &values[..5]);
    }

    let total = (&session.encrypt(40_i64)? + 2_i64)?;
    println!("Integer sum: {:?}", session.decrypt(&total)?);

    println!("Attempting x^16 on a depth-3 session...");
    match x.pow(16) {
        Ok(_) => println!("unexpected success"),
        Err(err) => println!("Refused: {err}"),
    }
    Ok(())
}
