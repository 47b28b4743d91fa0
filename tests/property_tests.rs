use pullgen::{EnumResult, Enumerator, StrategyKind, Value};
use quickcheck::{quickcheck, TestResult};

fn pull_all(mut e: Enumerator) -> EnumResult<(Vec<Value>, Value)> {
    let mut out = Vec::new();
    loop {
        match e.next() {
            Ok(value) => out.push(value),
            Err(err) => match err.result() {
                Some(result) => return Ok((out, result.clone())),
                None => return Err(err),
            },
        }
    }
}

fn pull_matches_push(items: Vec<i64>, strategy: StrategyKind) -> bool {
    let e = Enumerator::from_values(items.clone()).with_strategy(strategy);
    let pushed = e.to_vec();
    let pulled = pull_all(e);
    let expected: Vec<Value> = items.iter().copied().map(Value::Int).collect();
    pushed == Ok(expected.clone()) && pulled == Ok((expected, Value::from(items)))
}

#[test]
fn prop_pull_matches_push_cooperative() {
    fn prop(items: Vec<i64>) -> bool {
        pull_matches_push(items, StrategyKind::Cooperative)
    }
    quickcheck(prop as fn(Vec<i64>) -> bool);
}

#[test]
fn prop_pull_matches_push_thread() {
    fn prop(items: Vec<i64>) -> bool {
        pull_matches_push(items, StrategyKind::Thread)
    }
    quickcheck(prop as fn(Vec<i64>) -> bool);
}

#[test]
fn prop_peek_never_consumes() {
    fn prop(items: Vec<i64>, peeks: u8) -> bool {
        let mut e = Enumerator::from_values(items.clone());
        for expected in items {
            for _ in 0..(peeks % 4) {
                if e.peek() != Ok(Value::Int(expected)) {
                    return false;
                }
            }
            if e.next() != Ok(Value::Int(expected)) {
                return false;
            }
        }
        e.peek().is_err() && e.next().is_err()
    }
    quickcheck(prop as fn(Vec<i64>, u8) -> bool);
}

#[test]
fn prop_rewind_restarts() {
    fn prop(items: Vec<i64>, consumed: usize) -> TestResult {
        if items.is_empty() {
            return TestResult::discard();
        }
        let mut e = Enumerator::from_values(items.clone());
        for _ in 0..(consumed % (items.len() + 1)) {
            let _ = e.next();
        }
        e.rewind();
        TestResult::from_bool(e.next() == Ok(Value::Int(items[0])))
    }
    quickcheck(prop as fn(Vec<i64>, usize) -> TestResult);
}

#[test]
fn prop_take_drop_partition() {
    fn prop(items: Vec<i64>, n: u8) -> bool {
        let n = usize::from(n);
        let lazy = Enumerator::from_values(items.clone()).lazy();
        let mut joined = lazy.take(n).unwrap().force().unwrap();
        joined.extend(lazy.drop(n).unwrap().force().unwrap());

        let sizes_ok = lazy.take(n).unwrap().size() == Some(n.min(items.len()))
            && lazy.drop(n).unwrap().size() == Some(items.len().saturating_sub(n));
        let expected: Vec<Value> = items.into_iter().map(Value::Int).collect();
        sizes_ok && joined == expected
    }
    quickcheck(prop as fn(Vec<i64>, u8) -> bool);
}

#[test]
fn prop_select_reject_partition() {
    fn prop(items: Vec<i64>) -> bool {
        let lazy = Enumerator::from_values(items.clone()).lazy();
        let even = |v: &Value| v.as_int().is_some_and(|i| i % 2 == 0);
        let kept = lazy.select(even).force().unwrap();
        let dropped = lazy.reject(even).force().unwrap();
        kept.len() + dropped.len() == items.len()
            && kept.iter().all(even)
            && !dropped.iter().any(even)
    }
    quickcheck(prop as fn(Vec<i64>) -> bool);
}
