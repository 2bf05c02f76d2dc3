/*
 *  gpio.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  Push button trigger on a Raspberry Pi GPIO pin
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use log::{debug, info, warn};
use rppal::gpio::{Gpio, Trigger};
use std::time::Duration;
use tokio::sync::mpsc;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Watch a button wired between `pin` (BCM numbering) and ground.
///
/// Each press yields one `()` on the returned channel. Presses that arrive
/// while a previous one is still queued are dropped. The polling thread
/// exits once the receiver is gone.
pub fn watch_button(pin: u8) -> Result<mpsc::Receiver<()>, rppal::gpio::Error> {
    let mut button = Gpio::new()?.get(pin)?.into_input_pullup();
    button.set_interrupt(Trigger::FallingEdge)?;
    info!("Waiting for button presses on GPIO{pin}");

    let (tx, rx) = mpsc::channel(1);
    std::thread::Builder::new()
        .name("radarpi-button".to_string())
        .spawn(move || {
            while !tx.is_closed() {
                match button.poll_interrupt(true, Some(POLL_INTERVAL)) {
                    Ok(Some(level)) => {
                        debug!("GPIO{pin} -> {level:?}");
                        if tx.try_send(()).is_err() {
                            debug!("cycle already queued, press ignored");
                        }
                        std::thread::sleep(DEBOUNCE);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("GPIO{pin} poll failed: {e}");
                        break;
                    }
                }
            }
        })
        .map_err(rppal::gpio::Error::Io)?;

    Ok(rx)
}
