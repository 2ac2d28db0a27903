/// A mid-sized program touching every construct the front end lowers.
pub static SAMPLE: &str = include_str!("../fixtures/sample.tk");

/// Repeats [`SAMPLE`] `times` times. Every repetition after the first
/// redeclares its variables, so larger inputs also exercise error recovery.
pub fn scaled_sample(times: usize) -> String {
    let mut src = String::with_capacity(SAMPLE.len() * times);
    for _ in 0..times {
        src.push_str(SAMPLE);
    }
    src
}
