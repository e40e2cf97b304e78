fn main() {
    if let Err(e) = ent_triage_lib::run() {
        eprintln!("ent-triage: {e}");
        std::process::exit(1);
    }
}
