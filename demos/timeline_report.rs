use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    candidate_timelines::app::run_timeline_report(std::env::args().skip(1))
}
