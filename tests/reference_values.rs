use collatz_viz::*;
use num_bigint::BigUint;

fn run(n: u64) -> Trajectory {
    run_sequence(&Seed::try_from(n).unwrap(), &SequenceOptions::unbounded()).unwrap()
}

/// n=1..20 の適用回数 (OEIS A006577)
#[test]
fn test_a006577_first_20() {
    let expected = [0u64, 1, 7, 2, 5, 8, 16, 3, 19, 6, 14, 9, 9, 17, 17, 4, 12, 20, 20, 7];
    for (i, &want) in expected.iter().enumerate() {
        let n = i as u64 + 1;
        assert_eq!(run(n).transformations(), want, "n={}", n);
        assert_eq!(total_stopping_time_u64(n, None), Some(want), "n={}", n);
    }
}

/// 適用回数の記録保持者と最大値
#[test]
fn test_record_holders() {
    let cases: [(u64, u64, u64); 6] = [
        (27, 111, 9232),
        (97, 118, 9232),
        (871, 178, 190_996),
        (6171, 261, 975_400),
        (77_031, 350, 21_933_016),
        (837_799, 524, 2_974_984_576),
    ];
    for (n, steps, peak) in cases {
        let t = run(n);
        assert_eq!(t.transformations(), steps, "n={}", n);
        assert_eq!(t.reported_steps(), steps + 1, "n={}", n);
        assert_eq!(t.peak().1, &BigUint::from(peak), "n={}", n);
    }
}

/// 63728127 は途中で u32 を超える値 (966616035460) を通る
#[test]
fn test_63728127_exceeds_u32() {
    let t = run(63_728_127);
    assert_eq!(t.transformations(), 949);
    assert_eq!(t.peak().1, &BigUint::from(966_616_035_460u64));
}

/// 2 の冪は指数回で到達し、途中に奇数を含まない
#[test]
fn test_powers_of_two() {
    for k in 0u32..=63 {
        let t = run(1u64 << k);
        assert_eq!(t.transformations(), k as u64, "k={}", k);
        assert_eq!(t.peak().0, 1, "k={}", k);
    }
}
