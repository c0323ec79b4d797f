use arbitrary::Unstructured;
use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use super::*;

#[test]
fn test_revision_order() {
    assert!(Revision::new(1, 0) < Revision::new(1, 1));
    assert!(Revision::new(1, 9) < Revision::new(2, 0));
    assert!(Revision::default() < Revision::new(0, 1));
    assert_eq!(Revision::new(3, 1), Revision::new(3, 1));

    let seed: u128 = random();
    println!("test_revision_order seed {}", seed);
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..16].copy_from_slice(&seed.to_le_bytes());
    let mut rng = SmallRng::from_seed(seed_bytes);

    let bytes: Vec<u8> = (0..1024).map(|_| rng.gen::<u8>()).collect();
    let mut u = Unstructured::new(&bytes);
    for _i in 0..100 {
        let a: Revision = u.arbitrary().unwrap();
        let b: Revision = u.arbitrary().unwrap();
        assert_eq!(a.cmp(&b), (a.main, a.sub).cmp(&(b.main, b.sub)));
    }
}

#[test]
fn test_revision_zero() {
    assert!(Revision::default().is_zero());
    assert!(!Revision::new(0, 1).is_zero());
    assert!(!Revision::new(1, 0).is_zero());
}

#[test]
fn test_revision_display() {
    assert_eq!(Revision::new(15, 1).to_string(), "15.1");
    assert_eq!(Revision::default().to_string(), "0.0");
}

#[test]
fn test_revision_cbor() {
    let r = Revision::new(16, 1);
    let data = crate::util::into_cbor_bytes(r).unwrap();
    let (val, n) = crate::util::from_cbor_bytes::<Revision>(&data).unwrap();
    assert_eq!(n, data.len());
    assert_eq!(val, r);
}
