use pullgen::{
    matching, values, Counter, EnumError, Enumerator, Size, StrategyKind, Value, ZipSource,
};
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn ints(items: &[i64]) -> Vec<Value> {
    items.iter().copied().map(Value::Int).collect()
}

fn naturals() -> Enumerator {
    Enumerator::new(Arc::new(Counter::starting_at(1)), "each", Vec::new())
}

fn int(v: &Value) -> i64 {
    v.as_int().unwrap()
}

#[test]
fn test_take_on_infinite_source() {
    let lazy = naturals().lazy().take(3).unwrap();
    assert_eq!(lazy.force(), Ok(ints(&[1, 2, 3])));
    assert_eq!(lazy.size(), Some(3));

    assert_eq!(naturals().lazy().first(4), Ok(ints(&[1, 2, 3, 4])));
    assert_eq!(naturals().lazy().first_value(), Ok(Some(Value::Int(1))));
}

#[test]
fn test_take_pulls_from_infinite_source() {
    for strategy in [StrategyKind::Cooperative, StrategyKind::Thread] {
        let mut lazy = naturals()
            .with_strategy(strategy)
            .lazy()
            .map(|v| Value::Int(int(&v) * 10))
            .take(2)
            .unwrap();
        assert_eq!(lazy.next(), Ok(Value::Int(10)));
        assert_eq!(lazy.peek(), Ok(Value::Int(20)));
        assert_eq!(lazy.next(), Ok(Value::Int(20)));
        assert!(lazy.next().unwrap_err().is_iteration_ended());

        lazy.rewind();
        assert_eq!(lazy.next(), Ok(Value::Int(10)));
    }
}

#[test]
fn test_take_stops_right_after_last_element() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let lazy = naturals()
        .lazy()
        .map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v
        })
        .take(2)
        .unwrap();

    // Nothing runs until the chain is realized
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(lazy.force(), Ok(ints(&[1, 2])));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_take_zero_and_bad_counts() {
    let lazy = Enumerator::from_values(vec![1, 2, 3]).lazy();
    assert_eq!(lazy.take(0).unwrap().force(), Ok(Vec::new()));
    assert_eq!(lazy.take(0).unwrap().size(), Some(0));

    assert!(matches!(lazy.take(-1), Err(EnumError::InvalidArgument(_))));
    assert!(matches!(lazy.drop(-2), Err(EnumError::InvalidArgument(_))));
    assert!(matches!(lazy.take(1.5), Err(EnumError::InvalidArgument(_))));
    assert!(matches!(lazy.first("two"), Err(EnumError::InvalidArgument(_))));
}

#[test]
fn test_drop_then_take() {
    let lazy = Enumerator::from_values(vec![1, 2, 3, 4, 5])
        .lazy()
        .drop(2)
        .unwrap()
        .take(2)
        .unwrap();
    assert_eq!(lazy.force(), Ok(ints(&[3, 4])));
    assert_eq!(lazy.size(), Some(2));
}

#[test]
fn test_map_then_select() {
    let lazy = Enumerator::from_values(vec![1, 2, 3, 4])
        .lazy()
        .map(|v| Value::Int(int(&v) * 2))
        .select(|v| int(v) > 4);
    assert_eq!(lazy.force(), Ok(ints(&[6, 8])));
    assert_eq!(lazy.size(), None);
}

#[test]
fn test_size_rules() {
    let base = Enumerator::from_values(vec![1, 2, 3, 4, 5]).lazy();
    assert_eq!(base.size(), Some(5));
    assert_eq!(base.take(3).unwrap().size(), Some(3));
    assert_eq!(base.take(10).unwrap().size(), Some(5));
    assert_eq!(base.drop(2).unwrap().size(), Some(3));
    assert_eq!(base.drop(9).unwrap().size(), Some(0));
    assert_eq!(base.map(|v| v).size(), Some(5));
    assert_eq!(base.zip(Vec::new()).size(), Some(5));
    assert_eq!(base.reject(|_| false).size(), None);
    assert_eq!(base.take_while(|_| true).size(), None);
    assert_eq!(base.flat_map(|v| v).size(), None);

    let unknown = naturals().lazy();
    assert_eq!(unknown.size(), None);
    assert_eq!(unknown.take(4).unwrap().size(), Some(4));
    assert_eq!(unknown.drop(4).unwrap().size(), None);
}

#[test]
fn test_size_follows_dynamic_parent() {
    let len = Arc::new(AtomicUsize::new(3));
    let reported = len.clone();
    let lazy = Enumerator::from_values(vec![1, 2, 3])
        .with_size(Size::dynamic(move || Some(reported.load(Ordering::SeqCst))))
        .lazy()
        .drop(1)
        .unwrap();

    assert_eq!(lazy.size(), Some(2));
    len.store(10, Ordering::SeqCst);
    assert_eq!(lazy.size(), Some(9));
}

#[test]
fn test_take_while_and_drop_while() {
    let lazy = Enumerator::from_values(vec![1, 2, 5, 1, 7]).lazy();
    assert_eq!(lazy.take_while(|v| int(v) < 3).force(), Ok(ints(&[1, 2])));
    assert_eq!(lazy.drop_while(|v| int(v) < 3).force(), Ok(ints(&[5, 1, 7])));

    // Infinite sources end as soon as the predicate fails
    let prefix = naturals().lazy().take_while(|v| int(v) <= 4);
    assert_eq!(prefix.force(), Ok(ints(&[1, 2, 3, 4])));
}

#[test]
fn test_reject() {
    let lazy = Enumerator::from_values(vec![1, 2, 3, 4, 5])
        .lazy()
        .reject(|v| int(v) % 2 == 0);
    assert_eq!(lazy.force(), Ok(ints(&[1, 3, 5])));
}

#[test]
fn test_grep_with_patterns() {
    let words = Enumerator::from_values(vec!["apple", "banana", "avocado"]).lazy();
    let starts_with_a = Regex::new("^a").unwrap();
    assert_eq!(
        words.grep(starts_with_a).force(),
        Ok(values!["apple", "avocado"])
    );

    let numbers = Enumerator::from_values(vec![1, 2, 3, 4]).lazy();
    assert_eq!(numbers.grep(2i64..=3).force(), Ok(ints(&[2, 3])));
    assert_eq!(numbers.grep(Value::Int(4)).force(), Ok(ints(&[4])));
    assert_eq!(
        numbers.grep(matching(|v: &Value| int(v) != 2)).force(),
        Ok(ints(&[1, 3, 4]))
    );
}

#[test]
fn test_grep_map() {
    let lazy = Enumerator::from_values(vec![1, 5, 8, 12])
        .lazy()
        .grep_map(1i64..=9, |v| Value::Int(int(&v) + 100));
    assert_eq!(lazy.force(), Ok(ints(&[101, 105, 108])));
}

#[test]
fn test_flat_map_splices_lists() {
    let lazy = Enumerator::from_values(vec![1, 2, 3]).lazy().flat_map(|v| {
        let n = int(&v);
        if n == 2 {
            Value::Int(n)
        } else {
            Value::from(vec![n, -n])
        }
    });
    assert_eq!(lazy.force(), Ok(ints(&[1, -1, 2, 3, -3])));
}

#[test]
fn test_flat_map_respects_take() {
    let lazy = naturals()
        .lazy()
        .flat_map(|v| Value::from(vec![v.clone(), v]))
        .take(3)
        .unwrap();
    assert_eq!(lazy.force(), Ok(ints(&[1, 1, 2])));
}

#[test]
fn test_zip_pads_with_nil() {
    let letters = Enumerator::from_values(vec!["a", "b"]);
    let lazy = Enumerator::from_values(vec![1, 2, 3]).lazy().zip(vec![
        ZipSource::from(values![10, 20, 30, 40]),
        ZipSource::from(&letters),
    ]);

    let expected = vec![
        Value::List(values![1, 10, "a"]),
        Value::List(values![2, 20, "b"]),
        Value::List(vec![Value::Int(3), Value::Int(30), Value::Nil]),
    ];
    assert_eq!(lazy.force(), Ok(expected.clone()));
    // Fresh cursors on every realization
    assert_eq!(lazy.force(), Ok(expected));
}

#[test]
fn test_zip_with_infinite_lazy_source() {
    let evens = naturals().lazy().map(|v| Value::Int(int(&v) * 2));
    let lazy = Enumerator::from_values(vec!["x", "y"])
        .lazy()
        .zip(vec![ZipSource::from(&evens)]);
    assert_eq!(
        lazy.force(),
        Ok(vec![
            Value::List(values!["x", 2]),
            Value::List(values!["y", 4]),
        ])
    );
}

#[test]
fn test_stage_state_is_fresh_per_realization() {
    let lazy = Enumerator::from_values(vec![1, 2, 3, 4])
        .lazy()
        .drop(1)
        .unwrap()
        .take(2)
        .unwrap();
    assert_eq!(lazy.force(), Ok(ints(&[2, 3])));
    assert_eq!(lazy.force(), Ok(ints(&[2, 3])));

    let mut seen = Vec::new();
    lazy.each(|v| {
        seen.push(v);
        Ok(Value::Nil)
    })
    .unwrap();
    assert_eq!(seen, ints(&[2, 3]));
}

#[test]
fn test_early_stop_is_not_an_error() {
    let lazy = naturals().lazy().take(5).unwrap().take_while(|v| int(v) < 3);
    let result = lazy.each(|_| Ok(Value::Nil));
    assert_eq!(result, Ok(Value::Nil));
}

#[test]
fn test_transform_errors_surface() {
    let lazy = Enumerator::from_values(vec![1, 2, 3]).lazy().try_map(|v| {
        if int(&v) == 2 {
            Err(EnumError::custom("two is not allowed"))
        } else {
            Ok(v)
        }
    });
    assert_eq!(lazy.force(), Err(EnumError::custom("two is not allowed")));

    let mut pulled = lazy;
    assert_eq!(pulled.next(), Ok(Value::Int(1)));
    assert_eq!(pulled.next(), Err(EnumError::custom("two is not allowed")));

    let filtered = Enumerator::from_values(vec![1])
        .lazy()
        .try_select(|_| Err(EnumError::custom("predicate failed")));
    assert_eq!(filtered.force(), Err(EnumError::custom("predicate failed")));
}

#[test]
fn test_parent_errors_surface() {
    let failing = Enumerator::from_fn(|y, _| {
        y.push(1)?.push(2)?;
        Err(EnumError::custom("source failed").into())
    });

    let lazy = failing.lazy().map(|v| v);
    assert_eq!(lazy.force(), Err(EnumError::custom("source failed")));

    // Stopping before the failure never reaches it
    assert_eq!(failing.lazy().take(2).unwrap().force(), Ok(ints(&[1, 2])));
}

#[test]
fn test_lazy_is_identity_and_chains_stay_independent() {
    let base = Enumerator::from_values(vec![1, 2, 3]).lazy();
    let doubled = base.map(|v| Value::Int(int(&v) * 2)).lazy();
    let tripled = base.map(|v| Value::Int(int(&v) * 3));

    assert_eq!(doubled.force(), Ok(ints(&[2, 4, 6])));
    assert_eq!(tripled.force(), Ok(ints(&[3, 6, 9])));
    assert_eq!(base.force(), Ok(ints(&[1, 2, 3])));
}

#[test]
fn test_lazy_iter_and_into_enumerator() {
    let mut lazy = Enumerator::from_values(vec![3, 1, 2])
        .lazy()
        .select(|v| int(v) != 1);
    let collected: Vec<Value> = lazy.iter().map(Result::unwrap).collect();
    assert_eq!(collected, ints(&[3, 2]));

    let mut e = lazy.into_enumerator();
    e.rewind();
    assert_eq!(e.next(), Ok(Value::Int(3)));
}

#[test]
fn test_first_on_empty_source() {
    let lazy = Enumerator::from_values(Vec::<i64>::new()).lazy();
    assert_eq!(lazy.first(3), Ok(Vec::new()));
    assert_eq!(lazy.first_value(), Ok(None));
}

#[test]
fn test_lazy_over_multi_value_yields() {
    let pairs = Enumerator::from_fn(|y, _| {
        y.yield_(values!["a", 1])?;
        y.yield_(values!["b", 2])?;
        Ok(Value::Nil)
    });
    let lazy = pairs
        .lazy()
        .map(|pair| pair.as_list().map(|items| items[1].clone()).unwrap_or_default());
    assert_eq!(lazy.force(), Ok(ints(&[1, 2])));

    // Untouched stages hand the original pack downstream
    let mut kept = pairs.lazy().drop(1).unwrap();
    assert_eq!(kept.next(), Ok(Value::List(values!["b", 2])));
}

#[test]
fn test_lazy_exposes_full_pull_interface() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = seen.clone();
    let source = Enumerator::from_fn(move |y, _| {
        let got = y.yield_(values![1, 2])?;
        log.lock().unwrap().push(got);
        y.yield_(values![3])?;
        Ok(Value::Nil)
    });

    let mut lazy = source.lazy().select(|_| true);
    // Pass-through stages keep the raw pack
    assert_eq!(lazy.peek_values(), Ok(ints(&[1, 2])));
    assert_eq!(lazy.next_values(), Ok(ints(&[1, 2])));
    lazy.feed("fed").unwrap();
    assert_eq!(lazy.feed("again"), Err(EnumError::FeedAlreadyPending));
    assert_eq!(lazy.next(), Ok(Value::Int(3)));
    // The fed value reaches the root producer's yield
    assert_eq!(*seen.lock().unwrap(), vec![Value::from("fed")]);

    let mut dropped = Enumerator::from_values(vec![4, 5]).lazy().drop(1).unwrap();
    assert_eq!(dropped.next_values(), Ok(ints(&[5])));
    assert!(dropped.peek_values().unwrap_err().is_iteration_ended());
}
