fn main() {
    seqroute::app::startup::startup();
}
