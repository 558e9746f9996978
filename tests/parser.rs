mod common;

use common::{add2, mul3};
use duet::{Circuit, Error};

const CANONICAL: &str = "\
10 14
2 2 3

2 1 0 1 4 XOR
2 1 2 3 5 XOR
2 1 0 2 6 AND
2 1 1 3 7 AND
2 1 4 5 8 OR
1 1 6 9 INV
2 1 7 9 10 AND
2 1 8 10 11 XOR
2 1 4 6 12 OR
2 1 5 7 13 AND
";

#[test]
fn parses_text_with_interleaved_blank_lines() {
    let interleaved = "

10 14

2 2 3
2 1 0 1 4 XOR
2 1 2 3 5 XOR

2 1 0 2 6 AND
2 1 1 3 7 AND
2 1 4 5 8 OR


1 1 6 9 INV
2 1 7 9 10 AND
2 1 8 10 11 XOR
2 1 4 6 12 OR
2 1 5 7 13 AND

";
    let circuit = Circuit::parse(interleaved.as_bytes()).unwrap();
    assert_eq!(circuit, Circuit::parse(CANONICAL.as_bytes()).unwrap());
    assert_eq!(circuit.gates().len(), 10);
    assert_eq!(circuit.validate(), Ok(()));

    // Re-marshaling yields the canonical normalized text, byte for byte.
    let mut text = Vec::new();
    circuit.marshal(&mut text).unwrap();
    assert_eq!(text, CANONICAL.as_bytes());
}

#[test]
fn marshal_parse_roundtrips_generated_circuits() {
    for circuit in [add2(), mul3()] {
        let mut text = Vec::new();
        circuit.marshal(&mut text).unwrap();
        let parsed = Circuit::parse(text.as_slice()).unwrap();
        assert_eq!(parsed, circuit);

        let mut text_again = Vec::new();
        parsed.marshal(&mut text_again).unwrap();
        assert_eq!(text_again, text);
    }
}

#[test]
fn rejects_truncated_gate_lines() {
    let truncated = "1 3\n1 1 1\n2 1 0 1\n";
    assert!(matches!(
        Circuit::parse(truncated.as_bytes()),
        Err(Error::Parse { line: 3, .. })
    ));
}

#[test]
fn rejects_trailing_garbage_fields() {
    let text = "1 3\n1 1 1\n2 1 0 1 2 AND AND\n";
    assert!(matches!(
        Circuit::parse(text.as_bytes()),
        Err(Error::Parse { line: 3, .. })
    ));
}

#[test]
fn reports_the_offending_line_number() {
    let text = "2 5\n2 1 2\n2 1 0 1 3 XOR\n2 1 0 1 4 NOPE\n";
    assert_eq!(
        Circuit::parse(text.as_bytes()),
        Err(Error::Parse {
            line: 4,
            reason: "invalid operation 'NOPE'".to_string()
        })
    );
}

#[test]
fn parse_does_not_check_topology() {
    // Wire 9 is read before any gate produces it; parsing succeeds and the
    // garbler-side validation catches it.
    let text = "1 10\n1 1 1\n2 1 0 9 2 AND\n";
    let circuit = Circuit::parse(text.as_bytes()).unwrap();
    assert!(matches!(circuit.validate(), Err(Error::Topology(_))));
}
