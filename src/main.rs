fn main() {
    community_pulse_lib::run()
}
