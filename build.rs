fn main() {
    // ESP-IDF environment propagation is only needed for the firmware build.
    // Host builds (unit + integration tests) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
