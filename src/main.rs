use std::process;

fn main() {
    process::exit(taskr::cli::run());
}
