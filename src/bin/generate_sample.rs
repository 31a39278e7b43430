use std::io::Write;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[(self.next_u64() % options.len() as u64) as usize]
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let educations = ["High School", "Bachelor", "Master", "PhD", "Associate"];
    let intents = ["PERSONAL", "EDUCATION", "VENTURE", "MEDICAL"];
    let ownerships = ["RENT", "OWN", "MORTGAGE"];
    let terms = ["36 months", "60 months"];

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "person_age",
            "person_education",
            "person_emp_exp",
            "person_home_ownership",
            "loan_amnt",
            "loan_intent",
            "loan_int_rate",
            "loan_status",
            "credit_score",
            "previous_loan_defaults_on_file",
            "term",
        ])
        .expect("Failed to write header");

    let rows = 200;
    for _ in 0..rows {
        let age = rng.range(21.0, 65.0).round();
        let experience = rng.range(0.0, (age - 18.0).min(30.0)).round();
        let amount = (rng.range(500.0, 45000.0) / 100.0).round() * 100.0;
        let interest = (rng.range(4.0, 20.0) * 100.0).round() / 100.0;
        let credit_score = rng.range(450.0, 850.0).round();
        let approved = rng.next_f64() < 0.45;
        let defaulted = rng.next_f64() < 0.2;

        writer
            .write_record([
                format!("{age}"),
                rng.pick(&educations).to_string(),
                format!("{experience}"),
                rng.pick(&ownerships).to_string(),
                format!("{amount}"),
                rng.pick(&intents).to_string(),
                format!("{interest}"),
                if approved { "1" } else { "0" }.to_string(),
                format!("{credit_score}"),
                if defaulted { "Yes" } else { "No" }.to_string(),
                rng.pick(&terms).to_string(),
            ])
            .expect("Failed to write row");
    }

    let csv_bytes = writer.into_inner().expect("Failed to flush CSV");

    let csv_path = "sample_loan_data.csv";
    std::fs::write(csv_path, &csv_bytes).expect("Failed to write CSV file");

    // Zipped copy with the upstream entry name, for exercising extraction.
    let zip_path = "sample_loan_data.zip";
    let file = std::fs::File::create(zip_path).expect("Failed to create ZIP file");
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("loan_data.csv", zip::write::SimpleFileOptions::default())
        .expect("Failed to start ZIP entry");
    zip.write_all(&csv_bytes).expect("Failed to write ZIP entry");
    zip.finish().expect("Failed to finish ZIP file");

    println!("Wrote {rows} rows to {csv_path} and {zip_path}");
    println!("Serve it offline with: DATASET_FILE={csv_path} cargo run");
}
