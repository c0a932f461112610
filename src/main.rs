fn main() {
    prebake::app::cli::run();
}
