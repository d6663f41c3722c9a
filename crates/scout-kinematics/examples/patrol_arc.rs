use scout_kinematics::*;

fn main() {
    let wheel_base = 0.2;
    let drive_result = DifferentialDrive::new(wheel_base);

    let mut pose = Pose::new(14.5, 5.0, 0.0);
    // Left wheel slower than the right: a gentle counter-clockwise arc.
    let wheels = WheelSpeeds::new(0.3, 0.4);
    let dt = 0.05; // One scheduler tick
    let num_steps = 40;

    match drive_result {
        Ok(drive) => {
            println!("Differential drive: {}", drive);
            println!("  Wheel speeds:   {}", wheels);
            println!("  Chassis speeds: {}", drive.forward_kinematics(wheels));
            println!("  Start pose:     {}", pose);

            for i in 0..num_steps {
                match drive.update_pose_from_wheel_speeds(pose, wheels, dt) {
                    Ok(next) => {
                        pose = next;
                        if (i + 1) % 10 == 0 {
                            println!("Tick {:>2}: {}", i + 1, pose);
                        }
                    }
                    Err(e) => {
                        eprintln!("Integration failed at tick {}: {}", i + 1, e);
                        break;
                    }
                }
            }

            println!("Heading after {} s: {:.1} deg", num_steps as f64 * dt, pose.theta.to_degrees());
        }
        Err(e) => eprintln!("Invalid wheel base {}: {}", wheel_base, e),
    }
}
