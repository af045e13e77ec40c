fn main() -> Result<(), Box<dyn std::error::Error>> {
    pixelverse::cli::main()
}
