fn main() {
    harrier::board::init();
    harrier::uci::run();
}
