fn main() {
    motan_log::cli::run();
}
