use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::TupleError;
use crate::grouping::{GroupElements, GroupHandler, RollupGrouper};
use crate::schema::Schema;
use crate::sorting::{ComparatorRegistry, SortCriteria, SortPlan, TupleComparator};
use crate::tuple::Tuple;
use crate::types::Value;

// Test Helpers
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Open(usize, String),
    Element(String),
    Close(usize, String),
}

use Event::{Close, Element, Open};

/// Records every event, with tuples rendered through `Display`.
#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    /// Consume at most this many elements per group.
    take: Option<usize>,
}

impl GroupHandler for Recorder {
    fn on_open_group(&mut self, depth: usize, _field: &str, first: &Tuple) -> Result<(), TupleError> {
        self.events.push(Open(depth, first.to_string()));
        Ok(())
    }

    fn on_group_elements(
        &mut self,
        _depth: usize,
        elements: &mut GroupElements<'_>,
    ) -> Result<(), TupleError> {
        let limit = self.take.unwrap_or(usize::MAX);
        for tuple in elements.by_ref().take(limit) {
            self.events.push(Element(tuple.to_string()));
        }
        if limit > 0 {
            let seen = elements.last_seen().map(|t| Element(t.to_string()));
            assert_eq!(seen.as_ref(), self.events.last());
        }
        Ok(())
    }

    fn on_close_group(&mut self, depth: usize, _field: &str, last: &Tuple) -> Result<(), TupleError> {
        self.events.push(Close(depth, last.to_string()));
        Ok(())
    }
}

fn people() -> Arc<Schema> {
    Arc::new(Schema::parse("people", "country:string,age:vint,name:string,height:int").unwrap())
}

fn plan(schema: &Arc<Schema>, sort_by: &str) -> Arc<SortPlan> {
    let criteria = SortCriteria::parse(sort_by, &ComparatorRegistry::with_builtins()).unwrap();
    Arc::new(SortPlan::single(Arc::clone(schema), criteria).unwrap())
}

fn grouper(rollup_from: Option<&str>) -> RollupGrouper {
    let fields = vec!["country".to_string(), "age".to_string(), "name".to_string()];
    RollupGrouper::new(plan(&people(), "country asc, age asc, name asc"), fields, rollup_from).unwrap()
}

fn scenario() -> Vec<Tuple> {
    let schema = people();
    [
        ("ES", 20, "listo", 250),
        ("US", 14, "beber", 202),
        ("US", 14, "perro", 180),
        ("US", 14, "perro", 170),
        ("US", 15, "jauja", 160),
        ("US", 16, "listo", 160),
        ("XE", 20, "listo", 230),
    ]
    .iter()
    .map(|(c, a, n, h)| {
        Tuple::from_values(
            Arc::clone(&schema),
            vec![Value::from(*c), Value::Int(*a), Value::from(*n), Value::Int(*h)],
        )
        .unwrap()
    })
    .collect()
}

fn record(grouper: &RollupGrouper, tuples: Vec<Tuple>, take: Option<usize>) -> Vec<Event> {
    let mut recorder = Recorder { events: Vec::new(), take };
    grouper.run_tuples(tuples, &mut recorder).unwrap();
    recorder.events
}

/// Checks balance and nesting of an event sequence for depths `base..n`.
fn assert_well_nested(events: &[Event], base: usize, n: usize) {
    let mut open: Vec<usize> = Vec::new();
    let mut last_element: Option<&str> = None;
    let mut opened_with: Vec<String> = Vec::new();

    for event in events {
        match event {
            Open(depth, first) => {
                let expected = open.last().map_or(base, |d| d + 1);
                assert_eq!(*depth, expected, "open out of order in {:?}", events);
                open.push(*depth);
                opened_with.push(first.clone());
                if *depth == n - 1 {
                    last_element = None;
                }
            }
            Element(tuple) => {
                assert_eq!(open.last(), Some(&(n - 1)), "element outside innermost group");
                if last_element.is_none() {
                    assert_eq!(opened_with.last(), Some(tuple), "first element differs from open");
                }
                last_element = Some(tuple.as_str());
            }
            Close(depth, last) => {
                assert_eq!(open.pop(), Some(*depth), "close out of order in {:?}", events);
                opened_with.pop();
                if let Some(element) = last_element {
                    assert_eq!(last, element, "close does not carry the last element");
                }
            }
        }
    }
    assert!(open.is_empty(), "unbalanced: {:?} still open", open);
}

fn row(t: &Tuple) -> String {
    t.to_string()
}

//==================================================================================
// Scenarios
//==================================================================================

#[test]
fn test_full_rollup_scenario() {
    let t = scenario();
    let events = record(&grouper(Some("country")), t.clone(), None);

    let expected = vec![
        Open(0, row(&t[0])),
        Open(1, row(&t[0])),
        Open(2, row(&t[0])),
        Element(row(&t[0])),
        Close(2, row(&t[0])),
        Close(1, row(&t[0])),
        Close(0, row(&t[0])),
        Open(0, row(&t[1])),
        Open(1, row(&t[1])),
        Open(2, row(&t[1])),
        Element(row(&t[1])),
        Close(2, row(&t[1])),
        Open(2, row(&t[2])),
        Element(row(&t[2])),
        Element(row(&t[3])),
        Close(2, row(&t[3])),
        Close(1, row(&t[3])),
        Open(1, row(&t[4])),
        Open(2, row(&t[4])),
        Element(row(&t[4])),
        Close(2, row(&t[4])),
        Close(1, row(&t[4])),
        Open(1, row(&t[5])),
        Open(2, row(&t[5])),
        Element(row(&t[5])),
        Close(2, row(&t[5])),
        Close(1, row(&t[5])),
        Close(0, row(&t[5])),
        Open(0, row(&t[6])),
        Open(1, row(&t[6])),
        Open(2, row(&t[6])),
        Element(row(&t[6])),
        Close(2, row(&t[6])),
        Close(1, row(&t[6])),
        Close(0, row(&t[6])),
    ];
    assert_eq!(events, expected);
    assert_eq!(events, record(&grouper(None), t, None));
}

#[test]
fn test_rollup_base_limits_reported_depths() {
    let t = scenario();
    let events = record(&grouper(Some("age")), t.clone(), None);
    assert!(events.iter().all(|e| !matches!(e, Open(0, _) | Close(0, _))));
    assert_eq!(
        &events[..6],
        &[
            Open(1, row(&t[0])),
            Open(2, row(&t[0])),
            Element(row(&t[0])),
            Close(2, row(&t[0])),
            Close(1, row(&t[0])),
            Open(1, row(&t[1])),
        ]
    );
    assert_well_nested(&events, 1, 3);
}

#[test]
fn test_plain_grouping_on_last_field() {
    let t = scenario();
    let events = record(&grouper(Some("name")), t.clone(), None);
    let opens = events.iter().filter(|e| matches!(e, Open(..))).count();
    let elements = events.iter().filter(|e| matches!(e, Element(_))).count();
    assert_eq!(opens, 6);
    assert_eq!(elements, t.len());
    assert!(events.iter().all(|e| matches!(e, Open(2, _) | Close(2, _) | Element(_))));
    assert_well_nested(&events, 2, 3);
}

#[test]
fn test_unconsumed_elements_are_skipped() {
    let t = scenario();
    let events = record(&grouper(None), t.clone(), Some(1));
    // The perro group only shows its first element but still closes with the second.
    let perro = events
        .iter()
        .position(|e| *e == Open(2, row(&t[2])))
        .unwrap();
    assert_eq!(events[perro + 1], Element(row(&t[2])));
    assert_eq!(events[perro + 2], Close(2, row(&t[3])));

    let mut skipped = Recorder { events: Vec::new(), take: Some(0) };
    grouper(None).run_tuples(t, &mut skipped).unwrap();
    assert!(skipped.events.iter().all(|e| !matches!(e, Element(_))));
    assert_eq!(skipped.events.last(), Some(&Close(0, row(&scenario()[6]))));
}

#[test]
fn test_empty_stream_emits_nothing() {
    assert!(record(&grouper(None), Vec::new(), None).is_empty());
}

#[test]
fn test_single_tuple_stream() {
    let t = scenario();
    let events = record(&grouper(None), vec![t[0].clone()], None);
    assert_eq!(events.len(), 7);
    assert_well_nested(&events, 0, 3);
}

#[test]
fn test_grouping_honors_field_comparator() {
    let schema = Arc::new(Schema::parse("w", "word:string,n:int").unwrap());
    let plan = plan(&schema, "word using case_insensitive asc, n asc");
    let grouper = RollupGrouper::new(plan, vec!["word".to_string()], None).unwrap();
    let tuples: Vec<Tuple> = [("apple", 1), ("APPLE", 2), ("Banana", 1)]
        .iter()
        .map(|(w, n)| {
            Tuple::from_values(Arc::clone(&schema), vec![Value::from(*w), Value::Int(*n)]).unwrap()
        })
        .collect();

    let events = record(&grouper, tuples, None);
    let opens: Vec<&Event> = events.iter().filter(|e| matches!(e, Open(..))).collect();
    assert_eq!(opens.len(), 2);
    assert_eq!(events[3], Close(0, "APPLE\t2".to_string()));
}

#[test]
fn test_random_streams_are_well_nested() {
    let schema = Arc::new(Schema::parse("r", "a:int,b:int,c:int,d:int").unwrap());
    let plan = plan(&schema, "a asc, b desc, c asc, d asc");
    let comparator = TupleComparator::new(Arc::clone(&plan));
    let mut rng = StdRng::seed_from_u64(2024);

    for round in 0..30 {
        let n = rng.random_range(1..=3);
        let base = rng.random_range(0..n);
        let fields: Vec<String> = ["a", "b", "c"][..n].iter().map(|s| s.to_string()).collect();
        let rollup_from = fields[base].clone();
        let grouper = RollupGrouper::new(Arc::clone(&plan), fields, Some(&rollup_from)).unwrap();

        let mut tuples: Vec<Tuple> = (0..rng.random_range(0..40))
            .map(|_| {
                let values = (0..4).map(|_| Value::Int(rng.random_range(0..3))).collect();
                Tuple::from_values(Arc::clone(&schema), values).unwrap()
            })
            .collect();
        comparator.sort_tuples(&mut tuples).unwrap();
        let count = tuples.len();

        let events = record(&grouper, tuples, None);
        assert_well_nested(&events, base, n);
        let elements = events.iter().filter(|e| matches!(e, Element(_))).count();
        assert_eq!(elements, count, "round {}", round);
    }
}

//==================================================================================
// Failures
//==================================================================================

struct FailOnSecondOpen {
    opens: usize,
}

impl GroupHandler for FailOnSecondOpen {
    fn on_open_group(&mut self, _depth: usize, _field: &str, _first: &Tuple) -> Result<(), TupleError> {
        self.opens += 1;
        if self.opens == 2 {
            return Err(TupleError::Handler("stop".to_string()));
        }
        Ok(())
    }

    fn on_group_elements(&mut self, _: usize, _: &mut GroupElements<'_>) -> Result<(), TupleError> {
        Ok(())
    }
}

#[test]
fn test_handler_error_aborts_the_scan() {
    let mut handler = FailOnSecondOpen { opens: 0 };
    let err = grouper(None).run_tuples(scenario(), &mut handler).unwrap_err();
    assert!(matches!(err, TupleError::Handler(ref msg) if msg == "stop"));
    assert_eq!(handler.opens, 2);
}

#[test]
fn test_upstream_error_is_returned() {
    let t = scenario();
    let mut input: Vec<Result<Tuple, TupleError>> = t.iter().cloned().map(Ok).collect();
    input.insert(3, Err(TupleError::Decode("broken record".to_string())));

    let mut recorder = Recorder::default();
    let err = grouper(None).run(input, &mut recorder).unwrap_err();
    assert!(err.is_decode_error());
    // The perro group was open when the error arrived and is never closed.
    assert_eq!(recorder.events.last(), Some(&Element(row(&t[2]))));
}

#[test]
fn test_group_by_must_prefix_sort_fields() {
    let plan = plan(&people(), "country asc, age asc, name asc");
    let not_prefix = RollupGrouper::new(Arc::clone(&plan), vec!["age".to_string()], None);
    assert!(matches!(not_prefix, Err(TupleError::InvalidGroupBy(_))));

    let too_long = RollupGrouper::new(
        Arc::clone(&plan),
        ["country", "age", "name", "height"].iter().map(|s| s.to_string()).collect(),
        None,
    );
    assert!(matches!(too_long, Err(TupleError::InvalidGroupBy(_))));

    let empty = RollupGrouper::new(Arc::clone(&plan), Vec::new(), None);
    assert!(matches!(empty, Err(TupleError::InvalidGroupBy(_))));

    let bad_base = RollupGrouper::new(plan, vec!["country".to_string()], Some("age"));
    let err = bad_base.unwrap_err();
    assert!(matches!(err, TupleError::InvalidGroupBy(_)));
    assert!(err.is_configuration_error());
}
