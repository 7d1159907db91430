//! Console front-end for MNIST digit classification: train a new model, keep
//! training an existing one, or score it against the test set.

use std::io::{self, BufRead, Write};
use std::time::Instant;

use ffnet::prelude::*;

const MODEL_FILE: &str = "./network";
const TRAINING_FILE: &str = "./mnist_train.csv";
const TESTING_FILE: &str = "./mnist_test.csv";
const EPOCHS: usize = 5;

fn new_network(registry: &FunctionRegistry) -> Result<FFNetwork> {
    FFNetworkBuilder::new(0.01, 784, registry.error_metric("HalfSquaredError"))
        .add_layer(200, registry.activator("Sigmoid"))
        .add_layer(10, registry.activator("Sigmoid"))
        .build()
}

fn train_network(network: &mut FFNetwork) -> Result<()> {
    println!("Starting the training.");
    let started = Instant::now();
    for epoch in 1..=EPOCHS {
        println!("Starting epoch {}/{}.", epoch, EPOCHS);
        for record in MnistReader::open(TRAINING_FILE)? {
            let record = record?;
            network.train(&record.input, &record.target)?;
        }
        println!("Epoch ended.");
    }
    println!(
        "Training used {} epochs and took: {:?}",
        EPOCHS,
        started.elapsed()
    );
    Ok(())
}

fn argmax(output: &Array2<f64>) -> usize {
    let mut best = 0;
    let mut highest = f64::NEG_INFINITY;
    for (index, &value) in output.column(0).iter().enumerate() {
        if value > highest {
            best = index;
            highest = value;
        }
    }
    best
}

fn test_network(network: &mut FFNetwork) -> Result<()> {
    println!("Starting test.");
    let started = Instant::now();
    let mut score = 0usize;
    let mut total = 0usize;
    for record in MnistReader::open(TESTING_FILE)? {
        let record = record?;
        let output = network.forward(&record.input)?;
        if argmax(&output) == record.label {
            score += 1;
        }
        total += 1;
    }
    println!(
        "Test ended. Time taken to check: {:?}",
        started.elapsed()
    );
    println!("score: {}/{}", score, total);
    Ok(())
}

fn save_network(network: &FFNetwork) {
    println!("Saving...");
    if let Err(err) = storage::save(network, MODEL_FILE) {
        println!("Could not save the network! : {}", err);
    } else {
        println!("Network successfully saved.");
    }
}

fn train_new(registry: &FunctionRegistry) {
    match new_network(registry) {
        Ok(mut network) => {
            println!("Network created. Training...");
            match train_network(&mut network) {
                Ok(()) => save_network(&network),
                Err(err) => println!("Could not train the network! : {}", err),
            }
        }
        Err(err) => println!("Could not create the network! : {}", err),
    }
}

fn train_existing(registry: &FunctionRegistry) {
    match storage::load(MODEL_FILE, registry) {
        Ok(mut network) => {
            println!("Network loaded. Training...");
            match train_network(&mut network) {
                Ok(()) => save_network(&network),
                Err(err) => println!("Could not train the network! : {}", err),
            }
        }
        Err(err) => println!("Could not load the network! : {}", err),
    }
}

fn test_existing(registry: &FunctionRegistry) {
    match storage::load(MODEL_FILE, registry) {
        Ok(mut network) => {
            println!("Network loaded. Testing...");
            match test_network(&mut network) {
                Ok(()) => println!("Network tested."),
                Err(err) => println!("Could not test the network! : {}", err),
            }
        }
        Err(err) => println!("Could not load the network! : {}", err),
    }
}

fn menu(registry: &FunctionRegistry) {
    let stdin = io::stdin();
    loop {
        print!("Choose your option (train (n)ew, train (e)xisting, (t)est or (q)uit): ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => match line.trim() {
                "n" => train_new(registry),
                "e" => train_existing(registry),
                "t" => test_existing(registry),
                "q" => {
                    println!("Have a nice day!");
                    return;
                }
                _ => {}
            },
            Err(err) => {
                println!("Breaking in menu due to error : {}", err);
                return;
            }
        }
    }
}

fn main() {
    let registry = FunctionRegistry::standard();
    menu(&registry);
}
