use cv_vessel::{Value, ValueBuffer};

fn laid_out(sizes: &[usize]) -> ValueBuffer<f64> {
    let mut buf = ValueBuffer::new();
    buf.set_number_of_values(sizes.len());
    buf.set_value_sizes(sizes);
    buf
}

// ── Layout ──

#[test]
fn prefix_sum_matches_sizes() {
    let cases: &[&[usize]] = &[&[1], &[3, 2], &[1, 1, 1, 1], &[7, 1, 4, 2, 9], &[100, 1]];
    for &sizes in cases {
        let buf = laid_out(sizes);
        let starts = buf.value_starts();
        assert_eq!(starts.len(), sizes.len() + 1);
        assert_eq!(starts[0], 0);
        for (i, &s) in sizes.iter().enumerate() {
            assert_eq!(starts[i + 1] - starts[i], s, "sizes {sizes:?}, segment {i}");
            assert_eq!(buf.number_of_derivatives(i), s - 1);
        }
        assert_eq!(buf.len(), sizes.iter().sum::<usize>());
    }
}

#[test]
fn two_segment_layout() {
    let buf = laid_out(&[3, 2]);
    assert_eq!(buf.value_starts(), &[0, 3, 5]);
    assert_eq!(buf.number_of_values(), 2);
}

#[test]
#[should_panic(expected = "expected 2 segment sizes, got 3")]
fn sizes_must_match_declared_count() {
    let mut buf = ValueBuffer::<f64>::new();
    buf.set_number_of_values(2);
    buf.set_value_sizes(&[1, 2, 3]);
}

#[test]
#[should_panic(expected = "needs a value slot")]
fn zero_size_segment_rejected() {
    laid_out(&[2, 0]);
}

// ── Read-out ──

#[test]
fn round_trip_is_exact() {
    let mut buf = laid_out(&[3, 2]);
    buf.set_value(0, 2.0);
    buf.set_derivative(0, 0, 0.5);
    buf.set_derivative(0, 1, -0.5);
    buf.set_value(1, 1.0 / 3.0);
    buf.set_derivative(1, 0, std::f64::consts::PI);

    let mut v = Value::new();
    buf.get_value_into(0, &mut v);
    assert_eq!(v.get(), 2.0);
    assert_eq!(v.derivatives(), &[0.5, -0.5]);

    buf.get_value_into(1, &mut v);
    assert_eq!(v.get(), 1.0 / 3.0);
    assert_eq!(v.derivatives(), &[std::f64::consts::PI]);
}

#[test]
fn read_out_overwrites_stale_derivatives() {
    let mut buf = laid_out(&[3]);
    buf.set_derivative(0, 1, 4.0);

    // Same derivative count, stale contents.
    let mut v = Value::with_derivatives(2);
    v.set_derivative(0, 99.0);
    v.set_derivative(1, 99.0);
    buf.get_value_into(0, &mut v);
    assert_eq!(v.derivatives(), &[0.0, 4.0]);
}

#[test]
fn read_out_resizes_target() {
    let buf = laid_out(&[1, 4]);
    let mut v = Value::with_derivatives(7);
    buf.get_value_into(1, &mut v);
    assert_eq!(v.number_of_derivatives(), 3);
    buf.get_value_into(0, &mut v);
    assert_eq!(v.number_of_derivatives(), 0);
}

#[test]
fn scalar_read_ignores_derivatives() {
    let mut buf = laid_out(&[2, 3]);
    buf.set_value(1, -8.0);
    buf.set_derivative(1, 0, 1.0);
    assert_eq!(buf.get_value(1), -8.0);
    assert_eq!(buf.segment(1), &[-8.0, 1.0, 0.0]);
    assert_eq!(buf.derivatives(1), &[1.0, 0.0]);
}

#[test]
fn additive_writes_accumulate() {
    let mut buf = laid_out(&[2]);
    for k in 1..=4 {
        buf.add_to_value(0, k as f64);
        buf.add_to_derivative(0, 0, 0.25);
    }
    assert_eq!(buf.get_value(0), 10.0);
    assert_eq!(buf.derivatives(0), &[1.0]);
    buf.clear();
    assert_eq!(buf.segment(0), &[0.0, 0.0]);
    assert_eq!(buf.value_starts(), &[0, 2]);
}

// ── Bounds ──

#[test]
#[should_panic(expected = "segment index 2 out of range")]
fn scalar_read_out_of_range() {
    let buf = laid_out(&[3, 2]);
    let _ = buf.get_value(2);
}

#[test]
#[should_panic(expected = "segment index 5 out of range")]
fn value_read_out_of_range() {
    let buf = laid_out(&[3, 2]);
    let mut v = Value::new();
    buf.get_value_into(5, &mut v);
}

#[test]
#[should_panic(expected = "derivative 2 out of range for segment 0")]
fn derivative_write_past_segment() {
    let mut buf = laid_out(&[3, 2]);
    buf.set_derivative(0, 2, 1.0);
}

#[test]
#[should_panic(expected = "layout not built")]
fn fresh_buffer_has_no_segments() {
    let buf = ValueBuffer::<f64>::new();
    let _ = buf.get_value(0);
}
