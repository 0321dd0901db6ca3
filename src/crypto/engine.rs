//! Operator engine: one dispatch table for every `(operand, operand)` pair,
//! plus the level and scale bookkeeping each operation needs.
//!
//! Scale invariant: a ciphertext at level `l` normally carries the
//! context's canonical scale `s_l`, where `s_{l-1} = s_l^2 / q_l`. A product
//! of two level-`l` operands lands exactly on `s_{l-1}` after its rescale,
//! and a native operand is encoded at the ciphertext's current scale, so
//! ordinary expressions never need an extra alignment step. Alignment only
//! happens across levels, or for handles encrypted at a custom scale.

use std::{borrow::Cow, sync::Arc};

use tracing::{debug, instrument};

use super::{
    ciphertext::Ciphertext,
    context::RelinearizationPolicy,
    errors::{HeError, HeResult},
    session::SessionInner,
};
use crate::encoding::{Plaintext, Value, ValueKind};
use crate::keys::{KeySwitchKey, conjugation_element, galois_element};
use crate::rings::RnsPoly;

const MAX_ADJUST_FACTOR: f64 = (1u64 << 62) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

/// One side of a binary operation, tagged by how it is represented.
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Cipher(&'a Ciphertext),
    Plain(&'a Plaintext),
    Native(Value),
}

impl Operand<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Operand::Cipher(_) => "ciphertext",
            Operand::Plain(_) => "plaintext",
            Operand::Native(Value::Int(_)) => "integer",
            Operand::Native(Value::Float(_)) => "float",
            Operand::Native(Value::Vector(_)) => "vector",
        }
    }
}

/// Evaluates `lhs op rhs` where at least one side is a ciphertext.
///
/// | lhs \ rhs       | ciphertext          | plaintext            | native               |
/// |-----------------|---------------------|----------------------|----------------------|
/// | ciphertext      | aligned cipher op   | re-encoded to match  | encoded at ct scale  |
/// | plaintext       | commuted            | unsupported          | unsupported          |
/// | native          | commuted            | unsupported          | unsupported          |
///
/// Subtraction commutes as `x - ct = (-ct) + x`.
pub fn evaluate(op: BinaryOp, lhs: Operand<'_>, rhs: Operand<'_>) -> HeResult<Ciphertext> {
    match (lhs, rhs) {
        (Operand::Cipher(a), Operand::Cipher(b)) => match op {
            BinaryOp::Add => add(a, b),
            BinaryOp::Sub => sub(a, b),
            BinaryOp::Mul => multiply(a, b),
        },
        (Operand::Cipher(ct), Operand::Plain(pt)) => with_plaintext(op, ct, pt),
        (Operand::Cipher(ct), Operand::Native(value)) => {
            with_plaintext(op, ct, &encode_for(ct, &value)?)
        }
        (Operand::Plain(pt), Operand::Cipher(ct)) => commuted(op, ct, pt),
        (Operand::Native(value), Operand::Cipher(ct)) => commuted(op, ct, &encode_for(ct, &value)?),
        (lhs, rhs) => Err(HeError::UnsupportedOperands {
            lhs: lhs.describe(),
            rhs: rhs.describe(),
        }),
    }
}

fn commuted(op: BinaryOp, ct: &Ciphertext, pt: &Plaintext) -> HeResult<Ciphertext> {
    match op {
        BinaryOp::Sub => with_plaintext(BinaryOp::Add, &negate(ct), pt),
        _ => with_plaintext(op, ct, pt),
    }
}

fn encode_for(ct: &Ciphertext, value: &Value) -> HeResult<Plaintext> {
    ct.session.context.encoder().encode(value, ct.scale, ct.level)
}

fn with_plaintext(op: BinaryOp, ct: &Ciphertext, pt: &Plaintext) -> HeResult<Ciphertext> {
    ct.session.check_session(pt.session_id)?;
    let pt = match_plaintext(ct, pt)?;
    match op {
        BinaryOp::Add => Ok(add_plain(ct, &pt, false)),
        BinaryOp::Sub => Ok(add_plain(ct, &pt, true)),
        BinaryOp::Mul => mul_plain(ct, &pt),
    }
}

/// Re-encodes a plaintext of this session at the ciphertext's level and
/// scale when they differ.
fn match_plaintext<'a>(ct: &Ciphertext, pt: &'a Plaintext) -> HeResult<Cow<'a, Plaintext>> {
    if pt.level == ct.level && scales_match(pt.scale, ct.scale) {
        return Ok(Cow::Borrowed(pt));
    }
    let encoder = ct.session.context.encoder();
    let value = encoder.decode(pt)?;
    debug!(from_level = pt.level, to_level = ct.level, "re-encoding plaintext");
    Ok(Cow::Owned(encoder.encode(&value, ct.scale, ct.level)?))
}

fn scales_match(a: f64, b: f64) -> bool {
    (a / b - 1.0).abs() < 1e-9
}

fn require_levels(required: usize, available: usize) -> HeResult<()> {
    if available < required {
        return Err(HeError::DepthExhausted {
            required,
            available,
        });
    }
    Ok(())
}

// ─── Linear operations ───────────────────────────────────────────────────────

pub fn negate(ct: &Ciphertext) -> Ciphertext {
    Ciphertext {
        components: ct.components.iter().map(|c| -c.clone()).collect(),
        ..ct.clone()
    }
}

pub fn add(a: &Ciphertext, b: &Ciphertext) -> HeResult<Ciphertext> {
    add_like(a, b, false)
}

pub fn sub(a: &Ciphertext, b: &Ciphertext) -> HeResult<Ciphertext> {
    add_like(a, b, true)
}

fn add_like(a: &Ciphertext, b: &Ciphertext, subtract: bool) -> HeResult<Ciphertext> {
    a.session.check_session(b.session_id())?;
    let (a, b) = align(a, b)?;

    let mut components = a.components.clone();
    for (i, rhs) in b.components.iter().enumerate() {
        match (components.get_mut(i), subtract) {
            (Some(lhs), false) => *lhs += rhs,
            (Some(lhs), true) => *lhs -= rhs,
            (None, false) => components.push(rhs.clone()),
            (None, true) => components.push(-rhs.clone()),
        }
    }
    Ok(Ciphertext {
        components,
        level: a.level,
        scale: a.scale,
        kind: a.kind.promote(b.kind),
        session: Arc::clone(&a.session),
    })
}

fn add_plain(ct: &Ciphertext, pt: &Plaintext, subtract: bool) -> Ciphertext {
    let mut components = ct.components.clone();
    if subtract {
        components[0] -= &pt.poly;
    } else {
        components[0] += &pt.poly;
    }
    Ciphertext {
        components,
        level: ct.level,
        scale: ct.scale,
        kind: ct.kind.promote(pt.kind),
        session: Arc::clone(&ct.session),
    }
}

/// Brings two operands to a common level and scale for addition.
///
/// The higher operand is lowered so that its last step lands exactly on the
/// lower operand's scale. Equal levels with unequal scales both drop one
/// level to the canonical scale below, which is impossible at level 0.
fn align<'a>(
    a: &'a Ciphertext,
    b: &'a Ciphertext,
) -> HeResult<(Cow<'a, Ciphertext>, Cow<'a, Ciphertext>)> {
    use std::cmp::Ordering;

    match a.level.cmp(&b.level) {
        Ordering::Equal if scales_match(a.scale, b.scale) => Ok((Cow::Borrowed(a), Cow::Borrowed(b))),
        Ordering::Equal if a.level == 0 => Err(HeError::ScaleMismatch {
            lhs: a.scale,
            rhs: b.scale,
            level: 0,
        }),
        Ordering::Equal => {
            let target = a.session.context.canonical_scale(a.level - 1);
            Ok((
                Cow::Owned(adjust_scale(a, target)?),
                Cow::Owned(adjust_scale(b, target)?),
            ))
        }
        Ordering::Greater => Ok((
            Cow::Owned(lower_to_level(a, b.level, Some(b.scale))?),
            Cow::Borrowed(b),
        )),
        Ordering::Less => Ok((
            Cow::Borrowed(a),
            Cow::Owned(lower_to_level(b, a.level, Some(a.scale))?),
        )),
    }
}

// ─── Level management ────────────────────────────────────────────────────────

/// Drops one level and lands on `target` scale: multiplies by the integer
/// nearest to `target * q_l / scale`, then rescales by `q_l`.
///
/// Fails with [`HeError::ScaleMismatch`] at level 0, or when that integer is
/// too small to keep the session's precision.
fn adjust_scale(ct: &Ciphertext, target: f64) -> HeResult<Ciphertext> {
    let level = ct.level;
    let context = &ct.session.context;
    let mismatch = HeError::ScaleMismatch {
        lhs: ct.scale,
        rhs: target,
        level,
    };
    if level == 0 {
        return Err(mismatch);
    }
    let q = context.params().modulus_chain()[level] as f64;
    let factor = target * q / ct.scale;
    let min_factor = 1.0 / context.params().epsilon();
    if !(factor.is_finite() && factor >= min_factor && factor < MAX_ADJUST_FACTOR) {
        return Err(mismatch);
    }

    let multiplier = factor.round() as i64;
    let components = ct
        .components
        .iter()
        .map(|c| {
            let mut c = c.clone();
            c.mul_scalar_assign(multiplier);
            c
        })
        .collect();
    debug!(from_level = level, factor, target, "dropped one level");
    Ok(Ciphertext {
        components: rescale(&ct.session, components, level),
        level: level - 1,
        scale: target,
        kind: ct.kind,
        session: Arc::clone(&ct.session),
    })
}

/// Lowers `ct` to `level`. Intermediate steps use canonical scales; the last
/// step lands on `final_scale` when given.
pub fn lower_to_level(ct: &Ciphertext, level: usize, final_scale: Option<f64>) -> HeResult<Ciphertext> {
    if level > ct.level {
        return Err(HeError::parameter(format!(
            "cannot raise a level-{} ciphertext to level {level}",
            ct.level
        )));
    }
    let context = &ct.session.context;
    let mut current = ct.clone();
    while current.level > level {
        let next = current.level - 1;
        let target = match final_scale {
            Some(scale) if next == level => scale,
            _ => context.canonical_scale(next),
        };
        current = adjust_scale(&current, target)?;
    }
    Ok(current)
}

fn rescale(session: &SessionInner, components: Vec<RnsPoly>, level: usize) -> Vec<RnsPoly> {
    let target = session.context.level_basis(level - 1);
    components
        .iter()
        .map(|c| c.divide_round_by_last(Arc::clone(target)))
        .collect()
}

// ─── Multiplication ──────────────────────────────────────────────────────────

fn relinearize_components(
    session: &SessionInner,
    mut components: Vec<RnsPoly>,
    level: usize,
) -> Vec<RnsPoly> {
    if components.len() < 3 {
        return components;
    }
    let Some(d2) = components.pop() else {
        return components;
    };
    let context = &session.context;
    let (u0, u1) = session.evaluation_keys.relinearization_key().switch(
        &d2,
        context.key_basis(level),
        context.level_basis(level),
    );
    components[0] += &u0;
    components[1] += &u1;
    debug!(level, "relinearized");
    components
}

pub fn relinearize(ct: &Ciphertext) -> Ciphertext {
    if ct.size_terms() <= 2 {
        return ct.clone();
    }
    Ciphertext {
        components: relinearize_components(&ct.session, ct.components.clone(), ct.level),
        ..ct.clone()
    }
}

/// Ciphertext product: tensor, relinearize (unless deferred), rescale.
#[instrument(level = "debug", skip_all, fields(lhs_level = a.level, rhs_level = b.level))]
pub fn multiply(a: &Ciphertext, b: &Ciphertext) -> HeResult<Ciphertext> {
    a.session.check_session(b.session_id())?;
    require_levels(1, a.level.min(b.level))?;

    let mut a = relinearize(a);
    let mut b = relinearize(b);
    if a.level > b.level {
        a = lower_to_level(&a, b.level, None)?;
    } else if b.level > a.level {
        b = lower_to_level(&b, a.level, None)?;
    }
    let level = a.level;
    let session = &a.session;

    let to_ntt = |poly: &RnsPoly| {
        let mut poly = poly.clone();
        poly.to_ntt_domain();
        poly
    };
    let (a0, a1) = (to_ntt(&a.components[0]), to_ntt(&a.components[1]));
    let (b0, b1) = (to_ntt(&b.components[0]), to_ntt(&b.components[1]));

    let mut d0 = a0.clone();
    d0.mul_assign_ntt(&b0);
    let mut d1 = a0;
    d1.mul_assign_ntt(&b1);
    let mut cross = a1.clone();
    cross.mul_assign_ntt(&b0);
    d1 += &cross;
    let mut d2 = a1;
    d2.mul_assign_ntt(&b1);

    let mut components = vec![d0, d1, d2];
    for poly in &mut components {
        poly.to_coeff_domain();
    }
    if session.context.relinearization() == RelinearizationPolicy::Immediate {
        components = relinearize_components(session, components, level);
    }

    let scale = a.scale * b.scale / session.context.params().modulus_chain()[level] as f64;
    let components = rescale(session, components, level);
    debug!(level = level - 1, scale, terms = components.len(), "multiplied");
    Ok(Ciphertext {
        components,
        level: level - 1,
        scale,
        kind: a.kind.promote(b.kind),
        session: Arc::clone(session),
    })
}

/// Plaintext product. Scalars are constant polynomials, so their product is
/// a coefficient-wise scaling; vectors need a full ring product.
fn mul_plain(ct: &Ciphertext, pt: &Plaintext) -> HeResult<Ciphertext> {
    require_levels(1, ct.level)?;
    let components = ct
        .components
        .iter()
        .map(|c| match pt.constant {
            Some(constant) => {
                let mut c = c.clone();
                c.mul_scalar_assign(constant);
                c
            }
            None => c.ring_mul(&pt.poly),
        })
        .collect();

    let scale = ct.scale * pt.scale / ct.parameters().modulus_chain()[ct.level] as f64;
    Ok(Ciphertext {
        components: rescale(&ct.session, components, ct.level),
        level: ct.level - 1,
        scale,
        kind: ct.kind.promote(pt.kind),
        session: Arc::clone(&ct.session),
    })
}

/// Levels consumed by `x^exponent` under repeated squaring.
pub fn exponent_depth(exponent: u32) -> usize {
    exponent
        .checked_next_power_of_two()
        .map_or(32, |power| power.trailing_zeros() as usize)
}

/// `ct^exponent` by repeated squaring. The depth check runs before any
/// encrypted work.
#[instrument(level = "debug", skip(ct), fields(level = ct.level))]
pub fn pow(ct: &Ciphertext, exponent: u32) -> HeResult<Ciphertext> {
    require_levels(exponent_depth(exponent), ct.level)?;
    match exponent {
        0 => {
            let one = Value::one(ct.kind);
            let pt = ct.session.context.encoder().encode(&one, ct.scale, ct.level)?;
            ct.session.encrypt_plaintext(&pt, &mut rand::rng())
        }
        1 => Ok(ct.clone()),
        _ => {
            let mut base = relinearize(ct);
            let mut remaining = exponent;
            while remaining & 1 == 0 {
                base = multiply(&base, &base)?;
                remaining >>= 1;
            }
            let mut result = base.clone();
            remaining >>= 1;
            while remaining > 0 {
                base = multiply(&base, &base)?;
                if remaining & 1 == 1 {
                    result = multiply(&result, &base)?;
                }
                remaining >>= 1;
            }
            Ok(result)
        }
    }
}

// ─── Galois automorphisms ────────────────────────────────────────────────────

#[instrument(level = "debug", skip(ct), fields(level = ct.level))]
pub fn rotate(ct: &Ciphertext, steps: i64) -> HeResult<Ciphertext> {
    let context = &ct.session.context;
    let galois = galois_element(steps, context.params().ring_degree());
    if galois == 1 {
        return Ok(ct.clone());
    }
    let key = ct
        .session
        .evaluation_keys
        .rotation_key(galois)
        .ok_or(HeError::MissingRotationKey { steps })?;

    // Unused slots rotate into view.
    let kind = match ct.kind {
        ValueKind::Vector { .. } => ValueKind::Vector {
            len: context.params().slot_count(),
        },
        scalar => scalar,
    };
    Ok(apply_galois(ct, galois, key, kind))
}

#[instrument(level = "debug", skip(ct), fields(level = ct.level))]
pub fn conjugate(ct: &Ciphertext) -> HeResult<Ciphertext> {
    let key = ct
        .session
        .evaluation_keys
        .conjugation_key()
        .ok_or(HeError::MissingConjugationKey)?;
    let galois = conjugation_element(ct.session.context.params().ring_degree());
    Ok(apply_galois(ct, galois, key, ct.kind))
}

/// Applies `X -> X^g` to both components and switches the second one back
/// to the session secret with the matching Galois key.
fn apply_galois(ct: &Ciphertext, galois: usize, key: &KeySwitchKey, kind: ValueKind) -> Ciphertext {
    let context = &ct.session.context;
    let ct = relinearize(ct);
    let mut c0 = ct.components[0].automorphism(galois);
    let c1 = ct.components[1].automorphism(galois);
    let (u0, u1) = key.switch(&c1, context.key_basis(ct.level), context.level_basis(ct.level));
    c0 += &u0;
    Ciphertext {
        components: vec![c0, u1],
        kind,
        ..ct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_depth_is_ceil_log2() {
        let depths: Vec<usize> = [0, 1, 2, 3, 4, 5, 8, 9].map(exponent_depth).to_vec();
        assert_eq!(depths, vec![0, 0, 1, 2, 2, 3, 3, 4]);
        assert_eq!(exponent_depth(u32::MAX), 32);
    }

    #[test]
    fn pairs_without_a_ciphertext_are_unsupported() {
        let err = evaluate(
            BinaryOp::Mul,
            Operand::Native(Value::Float(1.0)),
            Operand::Native(Value::Vector(vec![1.0])),
        )
        .unwrap_err();
        assert_eq!(
            err,
            HeError::UnsupportedOperands {
                lhs: "float",
                rhs: "vector"
            }
        );
    }

    #[test]
    fn scale_comparison_is_relative() {
        assert!(scales_match(2f64.powi(40), 2f64.powi(40) * (1.0 + 1e-12)));
        assert!(!scales_match(2f64.powi(40), 2f64.powi(39)));
    }
}
