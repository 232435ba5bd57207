extern crate rand;
extern crate torus_life;

use rand::Rng;
use std::{thread, time};
use torus_life::BigBang;

fn main() {
    let mut engine = BigBang::new()
        .width(120)
        .height(40)
        .workers(4)
        .tile_size(16)
        .birth()
        .unwrap();

    let step_time = time::Duration::from_millis(30);

    let mut rng = rand::thread_rng();
    engine.seed_random(0.3, &mut rng).unwrap();
    loop {
        println!("\x1b[H\x1b[2J{}", engine);
        println!("Gen: {}  Pop: {}  Step: {:?}", engine.generation(), engine.population(), engine.last_step_time());
        // keep the soup from settling
        let mut rand_word: u64 = rng.gen::<u8>() as u64;
        for col in 58..62 {
            for row in 19..21 {
                if rand_word & 1 == 1 {
                    let alive = engine.get_cell(col, row);
                    engine.set_cell(col, row, !alive);
                }
                rand_word >>= 1;
            }
        }
        engine.step().unwrap();
        thread::sleep(step_time);
    }
}
